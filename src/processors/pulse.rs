// src/processors/pulse.rs
//
// Voice-capable audio source: a band-limited-free (naive) pulse/square
// oscillator at the frequency implied by `ctx.pitch_cents`, with a
// configurable duty cycle `p_pulse_width.jsonf` (default 0.5, a plain
// square wave).

use crate::device::DeviceParams;
use crate::math::cents_to_hz;
use crate::processor::{ProcessorImpl, ProcessorVoiceState, VoiceRenderContext};
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct Pulse;

impl ProcessorImpl for Pulse {
    fn type_tag(&self) -> &'static str {
        "pulse"
    }

    fn is_voice_capable(&self) -> bool {
        true
    }

    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(PulseVoiceState::default())
    }
}

#[derive(Default)]
struct PulseVoiceState {
    phase: f64,
}

impl ProcessorVoiceState for PulseVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {
        self.phase = 0.0;
    }

    fn render(&mut self, params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        let width = params.get_float("p_pulse_width.jsonf", 0.5).clamp(0.01, 0.99);
        let freq = cents_to_hz(ctx.pitch_cents);
        let inc = freq / ctx.audio_rate;

        let out = output.get_contents_mut();
        for sample in out[..ctx.frame_count].iter_mut() {
            *sample = if self.phase < width { 1.0 } else { -1.0 };
            self.phase = (self.phase + inc).fract();
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
    fn produces_bipolar_square_wave() {
        let mut state = PulseVoiceState::default();
        let params = DeviceParams::default();
        let mut rand = Random::default();
        let ctx = VoiceRenderContext {
            frame_count: 100,
            audio_rate: 48_000.0,
            tempo: 120.0,
            pitch_cents: 0.0,
            force_db: 0.0,
            note_on: true,
            released: false,
            rand: &mut rand,
        };
        let mut out = WorkBuffer::new(100);
        state.render(&params, &ctx, &mut out);
        assert!(out.get_contents().iter().all(|&v| v == 1.0 || v == -1.0));
    }
}
