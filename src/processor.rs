// src/processor.rs
//
// The DSP unit trait and its per-voice counterpart, splitting a processor
// into the two capabilities it can have independently: mixed-signal
// rendering (effects: read input ports, write output ports) and per-voice
// rendering (instrument sources: one independent evaluation per active
// voice, summed into the device's send port). A processor can have either,
// both, or neither -- neither is a fully silent placeholder, useful for
// processors under construction.
//
// `ProcessorRegistry` is a name -> factory map consulted when building a
// Module's audio units.

use std::collections::HashMap;

use crate::device::DeviceParams;
use crate::random::Random;
use crate::work_buffer::WorkBuffer;

/// Everything a mixed-signal process call needs: the input ports already
/// rendered by upstream devices, the output ports to fill, and timing.
pub struct MixedRenderContext<'a> {
    pub inputs: &'a [Option<&'a WorkBuffer>],
    pub frame_count: usize,
    pub audio_rate: f64,
    pub tempo: f64,
}

/// Everything a per-voice process call needs, beyond the voice's own
/// state: note parameters and a scratch output buffer to fill.
pub struct VoiceRenderContext<'a> {
    pub frame_count: usize,
    pub audio_rate: f64,
    pub tempo: f64,
    pub pitch_cents: f64,
    pub force_db: f64,
    pub note_on: bool,
    pub released: bool,
    pub rand: &'a mut Random,
}

/// Capability set for a DSP unit. `render_mixed`/`render_voice` default to
/// no-ops so a processor only implements what it actually does.
pub trait ProcessorImpl: Send + Sync {
    fn type_tag(&self) -> &'static str;

    fn is_voice_capable(&self) -> bool {
        false
    }

    fn is_mixed_capable(&self) -> bool {
        false
    }

    /// Create a fresh per-voice state, called once per voice-pool slot at
    /// prepare time. Only invoked when `is_voice_capable()`.
    fn make_voice_state(&self) -> Box<dyn ProcessorVoiceState> {
        Box::new(NullVoiceState)
    }

    /// Render one mixed-signal block into `output`, for the given send
    /// `port`. Only invoked when `is_mixed_capable()`; processors with a
    /// single output port can ignore `port`.
    fn render_mixed(&mut self, _params: &DeviceParams, _ctx: &MixedRenderContext, _port: u8, _output: &mut WorkBuffer) {}
}

/// Per-voice render state, reused across notes by resetting rather than
/// reallocating (see device::state::DeviceThreadState).
pub trait ProcessorVoiceState: Send {
    /// Reset to the state a freshly reserved voice should start in.
    fn activate(&mut self, params: &DeviceParams);

    /// Render one block. Returns `Some(frame)` when the voice has become
    /// definitively silent as of that offset within the block (e.g. the
    /// force envelope reached -inf), so the pool can deactivate it.
    fn render(&mut self, params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize>;
}

struct NullVoiceState;
impl ProcessorVoiceState for NullVoiceState {
    fn activate(&mut self, _params: &DeviceParams) {}
    fn render(&mut self, _params: &DeviceParams, ctx: &VoiceRenderContext, output: &mut WorkBuffer) -> Option<usize> {
        output.clear(0, ctx.frame_count);
        Some(0)
    }
}

pub type ProcessorFactory = fn() -> Box<dyn ProcessorImpl>;

/// Maps a processor type name (as it appears in model data, e.g.
/// `"volume"`) to the factory that builds it.
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: HashMap<&'static str, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_tag: &'static str, factory: ProcessorFactory) {
        self.factories.insert(type_tag, factory);
    }

    pub fn create(&self, type_tag: &str) -> Option<Box<dyn ProcessorImpl>> {
        self.factories.get(type_tag).map(|f| f())
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::processors::register_all(&mut reg);
        reg
    }
}
