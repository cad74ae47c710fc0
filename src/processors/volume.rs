// src/processors/volume.rs
//
// Fixed-gain mixed-signal processor: scales its single input port by a dB
// value, `p_volume.jsonf`. The simplest possible effect, and the one the
// end-to-end "identity effect" and "bypass vs. effect" scenarios exercise.

use crate::device::DeviceParams;
use crate::math::db_to_scale;
use crate::processor::{MixedRenderContext, ProcessorImpl};
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct Volume;

impl ProcessorImpl for Volume {
    fn type_tag(&self) -> &'static str {
        "volume"
    }

    fn is_mixed_capable(&self) -> bool {
        true
    }

    fn render_mixed(&mut self, params: &DeviceParams, ctx: &MixedRenderContext, _port: u8, output: &mut WorkBuffer) {
        let gain = db_to_scale(params.get_float("p_volume.jsonf", 0.0));
        match ctx.inputs.first().and_then(|i| *i) {
            Some(input) => {
                output.copy(input, 0, ctx.frame_count);
                let out = output.get_contents_mut();
                for s in out[..ctx.frame_count].iter_mut() {
                    *s *= gain as f32;
                }
                output.set_const_start(0);
                output.set_valid(true);
            }
            None => output.clear(0, ctx.frame_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_amplitude_at_positive_6db() {
        let mut input = WorkBuffer::new(4);
        input.get_contents_mut().fill(1.0);
        input.set_valid(true);
        let mut output = WorkBuffer::new(4);

        let mut params = DeviceParams::default();
        params.set("p_volume.jsonf", crate::device::ParamValue::Float(6.0));

        let ctx = MixedRenderContext {
            inputs: &[Some(&input)],
            frame_count: 4,
            audio_rate: 48_000.0,
            tempo: 120.0,
        };
        let mut volume = Volume;
        volume.render_mixed(&params, &ctx, 0, &mut output);
        assert!((output.get_contents()[0] - db_to_scale(6.0) as f32).abs() < 1e-5);
    }
}
