// src/processors/debug.rs
//
// Deterministic fixture processor used only by the integration test
// suite: as a voice source it emits a fixed repeating four-sample
// pattern (no randomness, no pitch/force dependence) so end-to-end
// rendering tests can assert on exact sample values; as a mixed effect
// it is a pure identity passthrough, useful for asserting a bypassed
// signal path is untouched. Not registered for use by real model data --
// only `tests/scenarios.rs` reaches for it by name.

use crate::device::DeviceParams;
use crate::processor::{MixedRenderContext, ProcessorImpl, ProcessorVoiceState, VoiceRenderContext};
use crate::work_buffer::WorkBuffer;

pub const PATTERN: [f32; 4] = [1.0, 0.5, 0.5, 0.5];

#[derive(Default)]
pub struct Debug;

impl ProcessorImpl for Debug {
    fn type_tag(&self) -> &'static str {
        "debug"
    }

    fn is_voice_capable(&self) -> bool {
        true
    }

    fn is_mixed_capable(&self) -> bool {
        true
    }

    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(DebugVoiceState::default())
    }

    fn render_mixed(&mut self, _params: &DeviceParams, ctx: &MixedRenderContext, _port: u8, output: &mut WorkBuffer) {
        match ctx.inputs.first().and_then(|i| *i) {
            Some(input) => output.copy(input, 0, ctx.frame_count),
            None => output.clear(0, ctx.frame_count),
        }
    }
}

#[derive(Default)]
struct DebugVoiceState {
    index: usize,
}

impl ProcessorVoiceState for DebugVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {
        self.index = 0;
    }

    fn render(&mut self, _params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        let out = output.get_contents_mut();
        for s in out[..ctx.frame_count].iter_mut() {
            *s = PATTERN[self.index % PATTERN.len()];
            self.index += 1;
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
    fn repeats_fixed_pattern() {
        let mut state = DebugVoiceState::default();
        let params = DeviceParams::default();
        let mut rand = Random::default();
        let ctx = VoiceRenderContext {
            frame_count: 8,
            audio_rate: 48_000.0,
            tempo: 120.0,
            pitch_cents: 0.0,
            force_db: 0.0,
            note_on: true,
            released: false,
            rand: &mut rand,
        };
        let mut out = WorkBuffer::new(8);
        state.render(&params, &ctx, &mut out);
        assert_eq!(out.get_contents(), &[1.0, 0.5, 0.5, 0.5, 1.0, 0.5, 0.5, 0.5]);
    }
}
