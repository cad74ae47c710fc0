// src/processors/slope.rs
//
// Mixed-capable slew-rate limiter: clamps the per-frame change of its
// input to at most `p_max_slope.jsonf` units per second, smoothing out
// abrupt control-signal jumps (e.g. a stepped stream feeding a filter
// cutoff) without the cost of a full envelope follower.

use crate::device::DeviceParams;
use crate::processor::{MixedRenderContext, ProcessorImpl};
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct Slope {
    last: f32,
}

impl ProcessorImpl for Slope {
    fn type_tag(&self) -> &'static str {
        "slope"
    }

    fn is_mixed_capable(&self) -> bool {
        true
    }

    fn render_mixed(&mut self, params: &DeviceParams, ctx: &MixedRenderContext, _port: u8, output: &mut WorkBuffer) {
        let Some(input) = ctx.inputs.first().and_then(|i| *i) else {
            output.clear(0, ctx.frame_count);
            return;
        };

        let max_slope = params.get_float("p_max_slope.jsonf", 1.0).max(0.0);
        let max_delta = (max_slope / ctx.audio_rate) as f32;

        let src = input.get_contents();
        let out = output.get_contents_mut();
        for i in 0..ctx.frame_count {
            let target = src[i];
            let delta = (target - self.last).clamp(-max_delta, max_delta);
            self.last += delta;
            out[i] = self.last;
        }
        output.set_valid(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ParamValue;

    #[test]
    fn limits_rate_of_change() {
        let mut input = WorkBuffer::new(8);
        input.get_contents_mut().fill(1.0);
        input.set_valid(true);

        let mut params = DeviceParams::default();
        params.set("p_max_slope.jsonf", ParamValue::Float(1.0));

        let mut slope = Slope::default();
        let ctx = MixedRenderContext { inputs: &[Some(&input)], frame_count: 8, audio_rate: 8.0, tempo: 120.0 };
        let mut out = WorkBuffer::new(8);
        slope.render_mixed(&params, &ctx, 0, &mut out);
        assert!((out.get_contents()[0] - 0.125).abs() < 1e-6);
    }
}
