// src/voice/mod.rs
//
// A Voice is one polyphonic note: an index into every voice-capable
// processor's pre-allocated per-voice-state vector, plus the bookkeeping
// the pool needs to decide which voice to steal when none is free. Voices
// do not own DSP state themselves -- see device::state::DeviceThreadState
// -- they are coordinates into it.

pub mod pool;

pub type VoiceId = usize;

/// Voice priority, used only to decide which voice a new note preempts
/// when the pool is full. Ordered so `new_note > foreground > background
/// > inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Inactive,
    Background,
    Foreground,
    NewNote,
}

#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub id: VoiceId,
    pub active: bool,
    pub priority: Priority,
    /// Monotonically increasing reservation counter; used as a tiebreaker
    /// so the oldest voice of equal priority is preempted first.
    pub generation: u64,
    /// Which instrument audio unit this voice belongs to (its id doubles as
    /// the index into every one of that audio unit's voice-capable
    /// processors' pre-allocated per-voice-state vectors, since one voice
    /// spans all of an instrument's processors at once). `None` for a
    /// group placeholder voice that only carries channel state.
    pub processor: Option<u32>,
    pub group_id: u64,
    pub channel: u32,
    pub note_on: bool,
    pub released: bool,
}

impl Voice {
    pub fn new(id: VoiceId) -> Self {
        Self {
            id,
            active: false,
            priority: Priority::Inactive,
            generation: 0,
            processor: None,
            group_id: 0,
            channel: 0,
            note_on: false,
            released: false,
        }
    }

    pub fn reserve(&mut self, processor: Option<u32>, group_id: u64, channel: u32, generation: u64, priority: Priority) {
        self.active = true;
        self.processor = processor;
        self.group_id = group_id;
        self.channel = channel;
        self.generation = generation;
        self.priority = priority;
        self.note_on = true;
        self.released = false;
    }

    pub fn release(&mut self) {
        self.released = true;
        self.note_on = false;
        self.priority = Priority::Background;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.priority = Priority::Inactive;
        self.processor = None;
        self.note_on = false;
        self.released = false;
    }
}
