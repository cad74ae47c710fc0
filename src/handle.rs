// src/handle.rs
//
// The synchronous facade a host embeds: one call in, one call out, no
// hidden threads. Every fallible method returns a plain `bool`/numeric
// sentinel and stashes the real `KqtError` in `last_error` for
// `get_error` to retrieve -- a C-API-shaped boundary with no command-queue
// indirection: this player has no second thread to hand commands to, so
// calls apply directly.

use crate::error::KqtError;
use crate::master::PlaybackMode;
use crate::model::Module;
use crate::player::Player;
use crate::processor::ProcessorRegistry;
use crate::value::Value;
use crate::work_buffer::WorkBuffer;

pub const DEFAULT_AUDIO_RATE: f64 = 48_000.0;
pub const DEFAULT_BUFFER_SIZE: usize = 2048;
pub const DEFAULT_VOICES_MAX: usize = 256;
pub const DEFAULT_CHANNELS_MAX: usize = 64;

/// Host-facing handle. Holds the loaded Module until `validate` builds a
/// Player from it; re-validating (e.g. after further `set_data` calls)
/// discards the previous Player and rebuilds.
pub struct Handle {
    module: Module,
    player: Option<Player>,
    registry: ProcessorRegistry,
    audio_rate: f64,
    buffer_size: usize,
    voices_max: usize,
    channels_max: usize,
    mixing_volume_db: f64,
    last_error: Option<KqtError>,
}

impl Handle {
    pub fn new() -> Self {
        Self {
            module: Module::new(),
            player: None,
            registry: ProcessorRegistry::with_builtins(),
            audio_rate: DEFAULT_AUDIO_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            voices_max: DEFAULT_VOICES_MAX,
            channels_max: DEFAULT_CHANNELS_MAX,
            mixing_volume_db: 0.0,
            last_error: None,
        }
    }

    /// Write one model-data key. Invalidates any already-built Player --
    /// `validate` must be called again before `play`.
    pub fn set_data(&mut self, key: &str, bytes: &[u8]) -> bool {
        self.player = None;
        self.try_or_record(|h| h.module.set_data(key, bytes))
    }

    pub fn set_audio_rate(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            self.last_error = Some(KqtError::Argument("audio rate must be positive".to_string()));
            return false;
        }
        self.audio_rate = rate;
        self.player = None;
        true
    }

    pub fn get_audio_rate(&self) -> f64 {
        self.audio_rate
    }

    pub fn set_audio_buffer_size(&mut self, size: usize) -> bool {
        if size == 0 {
            self.last_error = Some(KqtError::Argument("buffer size must be nonzero".to_string()));
            return false;
        }
        self.buffer_size = size;
        self.player = None;
        true
    }

    pub fn get_audio_buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn set_mixing_volume(&mut self, db: f64) -> bool {
        if !db.is_finite() && db != f64::NEG_INFINITY {
            self.last_error = Some(KqtError::Range("mixing volume must be finite or -inf".to_string()));
            return false;
        }
        self.mixing_volume_db = db;
        true
    }

    /// Build (or rebuild) the render-ready Player from the currently loaded
    /// Module. Must succeed before `play`/`get_audio` are called.
    pub fn validate(&mut self) -> bool {
        let module = std::mem::take(&mut self.module);
        let built = Player::new(
            module,
            &self.registry,
            self.audio_rate,
            self.buffer_size,
            self.voices_max,
            self.channels_max,
            120.0,
        );
        match built {
            Ok(mut player) => {
                player.set_mixing_volume(self.mixing_volume_db);
                for ch in 0..self.channels_max {
                    player.bind_channel_instrument(ch, ch as u32);
                }
                self.player = Some(player);
                true
            }
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }

    pub fn set_playback_mode(&mut self, mode: PlaybackMode) -> bool {
        self.with_player_mut(|p| {
            p.set_playback_mode(mode);
            Ok(())
        })
    }

    pub fn fire_event(&mut self, channel: usize, name: &str, args: &Value) -> bool {
        self.with_player_mut(|p| p.fire_event(channel, name, args))
    }

    pub fn play(&mut self) -> bool {
        true
    }

    pub fn stop(&mut self) -> bool {
        self.with_player_mut(|p| {
            p.stop();
            Ok(())
        })
    }

    /// Render up to the configured buffer size and return the number of
    /// frames available this call (0 once playback has fully stopped).
    pub fn get_frames_available(&mut self) -> usize {
        let buffer_size = self.buffer_size;
        let Some(player) = self.player.as_mut() else {
            self.last_error = Some(KqtError::Resource("handle not validated".to_string()));
            return 0;
        };
        match player.process(buffer_size) {
            Ok(n) => n,
            Err(e) => {
                self.last_error = Some(e);
                0
            }
        }
    }

    /// The rendered audio for the most recent `get_frames_available` call,
    /// for one output port (0 = left/mono, 1 = right).
    pub fn get_audio(&self, port: u8) -> Option<&WorkBuffer> {
        self.player.as_ref()?.master_output(port)
    }

    pub fn get_error(&self) -> Option<&KqtError> {
        self.last_error.as_ref()
    }

    fn try_or_record(&mut self, f: impl FnOnce(&mut Self) -> Result<(), KqtError>) -> bool {
        match f(self) {
            Ok(()) => true,
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }

    fn with_player_mut(&mut self, f: impl FnOnce(&mut Player) -> Result<(), KqtError>) -> bool {
        let Some(player) = self.player.as_mut() else {
            self.last_error = Some(KqtError::Resource("handle not validated".to_string()));
            return false;
        };
        match f(player) {
            Ok(()) => true,
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handle_requires_validate_before_play() {
        let mut handle = Handle::new();
        assert_eq!(handle.get_frames_available(), 0);
        assert!(handle.get_error().is_some());
    }

    #[test]
    fn validate_then_render_silence() {
        let mut handle = Handle::new();
        handle.set_audio_buffer_size(64);
        assert!(handle.validate());
        let frames = handle.get_frames_available();
        assert_eq!(frames, 64);
        let audio = handle.get_audio(0).unwrap();
        assert!(audio.get_contents().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn set_data_invalidates_player() {
        let mut handle = Handle::new();
        assert!(handle.validate());
        assert!(handle.set_data("au_00/proc_00/p_type.json", b"\"volume\""));
        assert_eq!(handle.get_frames_available(), 0);
    }
}
