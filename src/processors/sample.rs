// src/processors/sample.rs
//
// Voice-capable audio source: single-shot playback of a wavetable at the
// rate implied by the note's pitch. Loading arbitrary sample files is out
// of scope (the model format for sample banks is not specified); this
// processor ships one built-in wavetable (one cycle of a band-limited-ish
// triangle) so the representative processor set has something concrete
// to point to when no external sample data is available.

use crate::device::DeviceParams;
use crate::math::cents_to_hz;
use crate::processor::{ProcessorImpl, ProcessorVoiceState, VoiceRenderContext};
use crate::work_buffer::WorkBuffer;

const TABLE_LEN: usize = 256;

fn default_table() -> Vec<f32> {
    (0..TABLE_LEN)
        .map(|i| {
            let t = i as f64 / TABLE_LEN as f64;
            let tri = 4.0 * (t - (t + 0.75).floor() + 0.25).abs() - 1.0;
            tri as f32
        })
        .collect()
}

#[derive(Default)]
pub struct Sample;

impl ProcessorImpl for Sample {
    fn type_tag(&self) -> &'static str {
        "sample"
    }

    fn is_voice_capable(&self) -> bool {
        true
    }

    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(SampleVoiceState { table: default_table(), pos: 0.0, done: false })
    }
}

struct SampleVoiceState {
    table: Vec<f32>,
    pos: f64,
    done: bool,
}

impl ProcessorVoiceState for SampleVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {
        self.pos = 0.0;
        self.done = false;
    }

    fn render(&mut self, _params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        if self.done {
            output.clear(0, ctx.frame_count);
            return Some(0);
        }

        let freq = cents_to_hz(ctx.pitch_cents).max(1.0);
        let step = freq * self.table.len() as f64 / ctx.audio_rate;

        let out = output.get_contents_mut();
        let mut end = None;
        for (i, sample) in out[..ctx.frame_count].iter_mut().enumerate() {
            if self.pos >= self.table.len() as f64 {
                self.done = true;
                *sample = 0.0;
                if end.is_none() {
                    end = Some(i);
                }
                continue;
            }
            *sample = self.table[self.pos as usize];
            self.pos += step;
        }
        output.set_valid(true);
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Random;

    #[test]
    fn runs_to_completion_and_reports_end() {
        let mut state = SampleVoiceState { table: default_table(), pos: 0.0, done: false };
        let params = DeviceParams::default();
        let mut rand = Random::default();
        let ctx = VoiceRenderContext {
            frame_count: 64,
            audio_rate: 48_000.0,
            tempo: 120.0,
            pitch_cents: 6000.0,
            force_db: 0.0,
            note_on: true,
            released: false,
            rand: &mut rand,
        };
        let mut out = WorkBuffer::new(64);
        let mut end = None;
        for _ in 0..200 {
            if let Some(e) = state.render(&params, &ctx, &mut out) {
                end = Some(e);
                break;
            }
        }
        assert!(end.is_some());
    }
}
