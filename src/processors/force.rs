// src/processors/force.rs
//
// Voice-capable control-signal source: the per-note force (volume)
// envelope in dB, `p_env_force.json`. Drives a TimeEnvState across the
// block, releasing into the envelope's tail once the voice is released,
// and reports back to the render loop when it has decayed to silence so
// the voice can be deactivated instead of rendered forever.

use crate::device::DeviceParams;
use crate::envelope::Envelope;
use crate::processor::{ProcessorImpl, ProcessorVoiceState, VoiceRenderContext};
use crate::time_env_state::TimeEnvState;
use crate::work_buffer::WorkBuffer;

#[derive(Default)]
pub struct Force;

impl ProcessorImpl for Force {
    fn type_tag(&self) -> &'static str {
        "force"
    }

    fn is_voice_capable(&self) -> bool {
        true
    }

    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(ForceVoiceState::default())
    }
}

#[derive(Default)]
struct ForceVoiceState {
    env_state: TimeEnvState,
    was_released: bool,
}

impl ProcessorVoiceState for ForceVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {
        self.env_state.reset();
        self.was_released = false;
    }

    fn render(&mut self, params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        if ctx.released && !self.was_released {
            self.env_state.release();
            self.was_released = true;
        }

        let default_env = default_force_envelope();
        let env = params.get_envelope("p_env_force.json").unwrap_or(&default_env);

        let sustain = if ctx.note_on { 0.0 } else { 0.0 };
        let end = self.env_state.process(
            env,
            output,
            0,
            ctx.frame_count,
            ctx.audio_rate,
            sustain,
            None,
            f64::NEG_INFINITY,
            0.0,
        );

        for s in output.get_contents_mut()[..ctx.frame_count].iter_mut() {
            *s += ctx.force_db as f32;
        }

        end.filter(|_| self.was_released)
    }
}

/// Fallback shape when no `p_env_force.json` is set: an instant attack
/// and a short linear decay to silence, so a processor with no force
/// envelope configured still produces a finite, well-behaved note.
fn default_force_envelope() -> Envelope {
    let mut env = Envelope::new();
    env.set_nodes(vec![(0.0, 0.0), (0.01, 0.0), (0.5, -96.0)]);
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Random;

    #[test]
    fn released_voice_eventually_reports_end() {
        let mut state = ForceVoiceState::default();
        state.activate(&DeviceParams::default());
        let params = DeviceParams::default();
        let mut rand = Random::default();
        let mut ctx = VoiceRenderContext {
            frame_count: 64,
            audio_rate: 48_000.0,
            tempo: 120.0,
            pitch_cents: 0.0,
            force_db: 0.0,
            note_on: false,
            released: true,
            rand: &mut rand,
        };
        let mut out = WorkBuffer::new(64);
        let mut saw_end = false;
        for _ in 0..1000 {
            if state.render(&params, &ctx, &mut out).is_some() {
                saw_end = true;
                break;
            }
        }
        ctx.released = true;
        assert!(saw_end);
    }
}
