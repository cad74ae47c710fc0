// src/channel.rs
//
// Per-column playback state. Each of the model's columns owns one Channel,
// carrying the sliders/LFOs/arpeggio state that persists across triggers
// within that column -- a note-on event reads and seeds voice parameters
// from here, it does not carry them all itself.

use std::collections::HashMap;

use crate::envelope::{Lfo, Slider, SliderMode};
use crate::random::Random;
use crate::tstamp::Tstamp;

pub const ARPEGGIO_NOTES_MAX: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct Arpeggio {
    pub tones_cents: Vec<f64>,
    pub speed: f64,
    pub on: bool,
    pub index: usize,
    pub edit_pos: Tstamp,
}

impl Arpeggio {
    /// Tone offset to apply this frame, advancing the internal clock by
    /// `frames` audio frames at `audio_rate`.
    pub fn step(&mut self, audio_rate: f64) -> f64 {
        if !self.on || self.tones_cents.is_empty() || self.speed <= 0.0 {
            return 0.0;
        }
        self.edit_pos += Tstamp::from_frames(1.0, 60.0 * self.speed, audio_rate);
        let period = self.tones_cents.len();
        let step = (self.edit_pos.as_f64_beats() * self.speed) as usize % period;
        self.tones_cents[step]
    }
}

/// State carried forward between triggers in one column: volume/pitch/
/// force sliders used by portamento-style slides, a vibrato/tremolo LFO
/// pair, an arpeggio table, stream targets for `stream` processors, and
/// two independent Random sources (one for channel-scoped randomisation,
/// one reseeded per voice group).
pub struct Channel {
    pub carry_force: bool,
    pub carry_pitch: bool,
    pub force_db: Slider,
    pub pitch_cents: Slider,
    pub vibrato: Lfo,
    pub tremolo: Lfo,
    pub arpeggio: Arpeggio,
    pub stream_targets: HashMap<String, f64>,
    pub channel_random: Random,
    pub voice_random: Random,
    pub active_group_id: Option<u64>,
    pub mute: bool,
}

impl Channel {
    pub fn new(audio_rate: f64, tempo: f64, base_seed: u64, index: u64) -> Self {
        let mut force_db = Slider::new(audio_rate, tempo);
        force_db.set_mode(SliderMode::Linear);
        let mut pitch_cents = Slider::new(audio_rate, tempo);
        pitch_cents.set_mode(SliderMode::Linear);

        Self {
            carry_force: false,
            carry_pitch: false,
            force_db,
            pitch_cents,
            vibrato: Lfo::new(audio_rate),
            tremolo: Lfo::new(audio_rate),
            arpeggio: Arpeggio::default(),
            stream_targets: HashMap::new(),
            channel_random: Random::derive(base_seed, index * 2),
            voice_random: Random::derive(base_seed, index * 2 + 1),
            active_group_id: None,
            mute: false,
        }
    }

    pub fn set_mix_rate(&mut self, audio_rate: f64) {
        self.force_db.set_mix_rate(audio_rate);
        self.pitch_cents.set_mix_rate(audio_rate);
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.force_db.set_tempo(tempo);
        self.pitch_cents.set_tempo(tempo);
    }

    /// Reseed the per-voice random source for a freshly reserved voice
    /// group, keeping determinism tied to (base_seed, group generation).
    pub fn reseed_voice_random(&mut self, base_seed: u64, group_id: u64) {
        self.voice_random.reseed(base_seed, group_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_channel_starts_unmuted_with_no_carry() {
        let ch = Channel::new(48_000.0, 120.0, 1, 0);
        assert!(!ch.mute);
        assert!(!ch.carry_force);
        assert!(!ch.carry_pitch);
    }

    #[test]
    fn arpeggio_is_silent_when_off() {
        let mut arp = Arpeggio::default();
        assert_eq!(arp.step(48_000.0), 0.0);
    }
}
