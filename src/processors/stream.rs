// src/processors/stream.rs
//
// Mixed-capable control-signal generator: slides from its current value
// toward a target over a configured length, driven by `p_target.jsonf`
// and `p_slide_length.json` (a Tstamp). Unlike the per-note processors,
// a stream device has exactly one instance regardless of polyphony -- it
// is meant to feed a shared control signal (e.g. a filter cutoff) into
// several other devices via ordinary connections.

use crate::device::DeviceParams;
use crate::envelope::{Slider, SliderMode};
use crate::processor::{MixedRenderContext, ProcessorImpl};
use crate::work_buffer::WorkBuffer;

pub struct Stream {
    slider: Slider,
    configured_target: f64,
}

impl Default for Stream {
    fn default() -> Self {
        Self {
            slider: Slider::new(48_000.0, 120.0),
            configured_target: f64::NAN,
        }
    }
}

impl ProcessorImpl for Stream {
    fn type_tag(&self) -> &'static str {
        "stream"
    }

    fn is_mixed_capable(&self) -> bool {
        true
    }

    fn render_mixed(&mut self, params: &DeviceParams, ctx: &MixedRenderContext, _port: u8, output: &mut WorkBuffer) {
        self.slider.set_mix_rate(ctx.audio_rate);
        self.slider.set_tempo(ctx.tempo);
        self.slider.set_mode(SliderMode::Linear);

        let target = params.get_float("p_target.jsonf", 0.0);
        if target != self.configured_target {
            let length = params.get_tstamp("p_slide_length.json", crate::tstamp::Tstamp::ZERO);
            self.slider.change_target(target, length);
            self.configured_target = target;
        }

        let out = output.get_contents_mut();
        for s in out[..ctx.frame_count].iter_mut() {
            *s = self.slider.step() as f32;
        }
        output.set_valid(true);
        if !self.slider.is_moving() {
            output.set_const_start(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ParamValue;
    use crate::tstamp::Tstamp;

    #[test]
    fn slides_toward_configured_target() {
        let mut params = DeviceParams::default();
        params.set("p_target.jsonf", ParamValue::Float(1.0));
        params.set("p_slide_length.json", ParamValue::Tstamp(Tstamp::from_beats(1)));

        let mut stream = Stream::default();
        let mut out = WorkBuffer::new(48_000);
        let ctx = MixedRenderContext { inputs: &[], frame_count: 48_000, audio_rate: 48_000.0, tempo: 60.0 };
        stream.render_mixed(&params, &ctx, 0, &mut out);
        assert!((out.get_contents()[48_000 - 1] - 1.0).abs() < 1e-6);
    }
}
