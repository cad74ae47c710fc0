// src/processors/panning.rs
//
// Equal-power stereo panner: one mono input port, two output ports
// (0 = left, 1 = right). Pan position is `p_pan.jsonf` in `[-1.0, 1.0]`.

use crate::device::DeviceParams;
use crate::processor::{MixedRenderContext, ProcessorImpl};
use crate::work_buffer::WorkBuffer;

pub const PORT_LEFT: u8 = 0;
pub const PORT_RIGHT: u8 = 1;

#[derive(Default)]
pub struct Panning;

impl ProcessorImpl for Panning {
    fn type_tag(&self) -> &'static str {
        "panning"
    }

    fn is_mixed_capable(&self) -> bool {
        true
    }

    fn render_mixed(&mut self, params: &DeviceParams, ctx: &MixedRenderContext, port: u8, output: &mut WorkBuffer) {
        let Some(input) = ctx.inputs.first().and_then(|i| *i) else {
            output.clear(0, ctx.frame_count);
            return;
        };

        let pan = params.get_float("p_pan.jsonf", 0.0).clamp(-1.0, 1.0);
        let angle = (pan + 1.0) * std::f64::consts::FRAC_PI_4;
        let (left_gain, right_gain) = (angle.cos(), angle.sin());
        let gain = if port == PORT_LEFT { left_gain } else { right_gain } as f32;

        output.copy(input, 0, ctx.frame_count);
        for s in output.get_contents_mut()[..ctx.frame_count].iter_mut() {
            *s *= gain;
        }
        output.set_valid(true);
    }
}
