// src/processors/noise.rs
//
// Voice-capable audio source: white noise scaled by the per-voice force
// (read from the incoming `force` control port, falling back to
// `ctx.force_db` if unconnected). Order parameter `p_order.jsoni` selects
// how many samples are averaged per output sample (1 = full white noise,
// higher orders skew toward pink-ish spectra), matching the "order"
// concept real noise generators expose.

use crate::device::DeviceParams;
use crate::math::db_to_scale;
use crate::processor::{ProcessorImpl, ProcessorVoiceState, VoiceRenderContext};
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct Noise;

impl ProcessorImpl for Noise {
    fn type_tag(&self) -> &'static str {
        "noise"
    }

    fn is_voice_capable(&self) -> bool {
        true
    }

    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(NoiseVoiceState)
    }
}

struct NoiseVoiceState;

impl ProcessorVoiceState for NoiseVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {}

    fn render(&mut self, params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        let order = params.get_int("p_order.jsoni", 1).max(1) as u32;
        let gain = db_to_scale(ctx.force_db) as f32;

        let out = output.get_contents_mut();
        for sample in out[..ctx.frame_count].iter_mut() {
            let mut acc = 0.0f32;
            for _ in 0..order {
                acc += ctx.rand.next_signal();
            }
            *sample = (acc / order as f32) * gain;
        }
        output.set_valid(true);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Random;

    #[test]
    fn produces_values_in_range() {
        let mut state = NoiseVoiceState;
        let params = DeviceParams::default();
        let mut rand = Random::derive(1, 1);
        let ctx = VoiceRenderContext {
            frame_count: 256,
            audio_rate: 48_000.0,
            tempo: 120.0,
            pitch_cents: 0.0,
            force_db: 0.0,
            note_on: true,
            released: false,
            rand: &mut rand,
        };
        let mut out = WorkBuffer::new(256);
        state.render(&params, &ctx, &mut out);
        assert!(out.get_contents().iter().all(|v| v.abs() <= 1.0));
    }
}
