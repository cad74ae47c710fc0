// src/processors/pitch.rs
//
// Voice-capable control-signal source: emits the note's current pitch, in
// cents relative to A4, as a constant-region WorkBuffer. Downstream
// pitched processors (pulse, sample) read this via a connection rather
// than hardcoding "voice pitch" -- the same wiring a vibrato LFO or a
// portamento slide would feed through instead.

use crate::device::DeviceParams;
use crate::processor::{ProcessorImpl, ProcessorVoiceState, VoiceRenderContext};
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct PitchSource;

impl ProcessorImpl for PitchSource {
    fn type_tag(&self) -> &'static str {
        "pitch"
    }

    fn is_voice_capable(&self) -> bool {
        true
    }

    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(PitchVoiceState::default())
    }
}

#[derive(Default)]
struct PitchVoiceState;

impl ProcessorVoiceState for PitchVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {}

    fn render(&mut self, _params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        let out = output.get_contents_mut();
        out[..ctx.frame_count].fill(ctx.pitch_cents as f32);
        output.set_const_start(0);
        output.set_valid(true);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Random;

    #[test]
    fn emits_constant_pitch() {
        let mut state = PitchVoiceState::default();
        let params = DeviceParams::default();
        let mut rand = Random::default();
        let ctx = VoiceRenderContext {
            frame_count: 4,
            audio_rate: 48_000.0,
            tempo: 120.0,
            pitch_cents: 1200.0,
            force_db: 0.0,
            note_on: true,
            released: false,
            rand: &mut rand,
        };
        let mut out = WorkBuffer::new(4);
        state.render(&params, &ctx, &mut out);
        assert!(out.get_contents().iter().all(|&v| v == 1200.0));
    }
}
