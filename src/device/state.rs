// src/device/state.rs
//
// Per-device render scratch: mixed-signal port buffers plus, for
// voice-capable processors, one boxed per-voice state per voice-pool slot.
// The per-voice vector is sized and allocated once when the device is
// prepared, so firing a note-on never allocates -- it only activates an
// already-existing slot indexed by voice id.

use crate::processor::{ProcessorImpl, ProcessorVoiceState};
use crate::work_buffer::WorkBuffer;

/// Mixed-signal (non-voice) scratch for one device: one buffer per
/// existing port, sized to the render block.
pub struct DeviceState {
    pub receive_bufs: Vec<Option<WorkBuffer>>,
    pub send_bufs: Vec<Option<WorkBuffer>>,
    pub mixed_audio_produced: bool,
}

impl DeviceState {
    pub fn new(num_ports: usize, block_size: usize) -> Self {
        Self {
            receive_bufs: (0..num_ports).map(|_| Some(WorkBuffer::new(block_size))).collect(),
            send_bufs: (0..num_ports).map(|_| Some(WorkBuffer::new(block_size))).collect(),
            mixed_audio_produced: false,
        }
    }

    pub fn reset_for_block(&mut self) {
        for b in self.receive_bufs.iter_mut().flatten() {
            b.reset();
        }
        for b in self.send_bufs.iter_mut().flatten() {
            b.reset();
        }
    }
}

/// Per-device-thread state: the mixed state above, plus one temp voice
/// scratch buffer and (for voice-capable processors) a pre-allocated
/// per-voice-state slot per voice-pool entry.
pub struct DeviceThreadState {
    pub mixed: DeviceState,
    pub temp_voice: WorkBuffer,
    pub processor_impl: Box<dyn ProcessorImpl>,
    pub voice_states: Vec<Box<dyn ProcessorVoiceState>>,
}

impl DeviceThreadState {
    pub fn new(num_ports: usize, block_size: usize, processor_impl: Box<dyn ProcessorImpl>, voices_max: usize) -> Self {
        let voice_states = if processor_impl.is_voice_capable() {
            (0..voices_max).map(|_| processor_impl.make_voice_state()).collect()
        } else {
            Vec::new()
        };
        Self {
            mixed: DeviceState::new(num_ports, block_size),
            temp_voice: WorkBuffer::new(block_size),
            processor_impl,
            voice_states,
        }
    }
}
