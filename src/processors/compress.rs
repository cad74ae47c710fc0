// src/processors/compress.rs
//
// Mixed-capable feed-forward compressor: a one-pole peak-envelope
// follower feeds a static threshold/ratio gain curve. Parameters:
// `p_threshold.jsonf` (dB), `p_ratio.jsonf` (>= 1.0), `p_release.jsonf`
// (envelope release time in seconds).

use crate::device::DeviceParams;
use crate::math::{db_to_scale, scale_to_db};
use crate::processor::{MixedRenderContext, ProcessorImpl};
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct Compress {
    envelope: f32,
}

impl ProcessorImpl for Compress {
    fn type_tag(&self) -> &'static str {
        "compress"
    }

    fn is_mixed_capable(&self) -> bool {
        true
    }

    fn render_mixed(&mut self, params: &DeviceParams, ctx: &MixedRenderContext, _port: u8, output: &mut WorkBuffer) {
        let Some(input) = ctx.inputs.first().and_then(|i| *i) else {
            output.clear(0, ctx.frame_count);
            return;
        };

        let threshold_db = params.get_float("p_threshold.jsonf", -12.0);
        let ratio = params.get_float("p_ratio.jsonf", 4.0).max(1.0);
        let release_seconds = params.get_float("p_release.jsonf", 0.2).max(1e-4);
        let release_coeff = (-1.0 / (release_seconds * ctx.audio_rate)).exp() as f32;

        let src = input.get_contents();
        let out = output.get_contents_mut();
        for i in 0..ctx.frame_count {
            let level = src[i].abs();
            self.envelope = if level > self.envelope {
                level
            } else {
                self.envelope * release_coeff + level * (1.0 - release_coeff)
            };

            let level_db = scale_to_db(self.envelope as f64);
            let gain_db = if level_db > threshold_db {
                threshold_db + (level_db - threshold_db) / ratio - level_db
            } else {
                0.0
            };
            out[i] = src[i] * db_to_scale(gain_db) as f32;
        }
        output.set_valid(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ParamValue;

    #[test]
    fn attenuates_signal_above_threshold() {
        let mut input = WorkBuffer::new(512);
        input.get_contents_mut().fill(1.0);
        input.set_valid(true);

        let mut params = DeviceParams::default();
        params.set("p_threshold.jsonf", ParamValue::Float(-20.0));
        params.set("p_ratio.jsonf", ParamValue::Float(4.0));

        let mut compress = Compress::default();
        let ctx = MixedRenderContext { inputs: &[Some(&input)], frame_count: 512, audio_rate: 48_000.0, tempo: 120.0 };
        let mut out = WorkBuffer::new(512);
        compress.render_mixed(&params, &ctx, 0, &mut out);
        assert!(out.get_contents()[511].abs() < 1.0);
    }
}
