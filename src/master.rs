// src/master.rs
//
// Top-level playback parameters that exist independent of any one
// instrument or column: the current Position, the tempo and global volume
// sliders (so `=` tempo-slide and global volume-slide events have
// somewhere to live), the selected tuning table, playback mode, and the
// fade-out envelope applied when stopping mid-note rather than at a
// pattern boundary.

use crate::envelope::Slider;
use crate::pattern::Position;
use crate::tstamp::Tstamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Play a single pattern instance and stop.
    PatternInstance,
    /// Walk one track's order list to its end.
    Track,
    /// Walk every track in sequence (song order).
    Song,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    None,
    FadingOut,
    Stopped,
}

pub struct MasterParams {
    pub position: Position,
    pub tempo: Slider,
    pub global_volume: Slider,
    pub tuning_table: Option<u32>,
    pub mode: PlaybackMode,
    pub fade: FadeState,
    pub fade_progress: f64,
    /// Length of the fade-out, in seconds: a short fixed ramp so `stop()`
    /// never clicks.
    pub fade_out_seconds: f64,
    pub random_seed: u64,
}

impl MasterParams {
    pub fn new(audio_rate: f64, initial_tempo: f64, random_seed: u64) -> Self {
        let mut tempo = Slider::new(audio_rate, initial_tempo);
        tempo.start(initial_tempo, Tstamp::ZERO);
        tempo.change_target(initial_tempo, Tstamp::ZERO);

        let mut global_volume = Slider::new(audio_rate, initial_tempo);
        global_volume.start(0.0, Tstamp::ZERO);
        global_volume.change_target(0.0, Tstamp::ZERO);

        Self {
            position: Position::default(),
            tempo,
            global_volume,
            tuning_table: None,
            mode: PlaybackMode::PatternInstance,
            fade: FadeState::None,
            fade_progress: 0.0,
            fade_out_seconds: 0.05,
            random_seed,
        }
    }

    pub fn begin_fade_out(&mut self) {
        if self.fade == FadeState::None {
            self.fade = FadeState::FadingOut;
            self.fade_progress = 0.0;
        }
    }

    /// Advance the fade-out by `frames` audio frames at `audio_rate`.
    /// Returns the linear gain to apply this step (1.0 when not fading).
    pub fn step_fade(&mut self, frames: usize, audio_rate: f64) -> f64 {
        match self.fade {
            FadeState::None => 1.0,
            FadeState::Stopped => 0.0,
            FadeState::FadingOut => {
                self.fade_progress += frames as f64 / audio_rate;
                if self.fade_progress >= self.fade_out_seconds {
                    self.fade = FadeState::Stopped;
                    0.0
                } else {
                    1.0 - (self.fade_progress / self.fade_out_seconds)
                }
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.fade == FadeState::Stopped
    }
}
