// src/audio_unit.rs
//
// An AudioUnit is a Device whose implementation is a nested Connections
// graph rather than a single processor: instruments (note-producing) and
// effects (audio-transforming) are both audio units, distinguished only by
// `is_instrument` and by which interface ports the outer graph is allowed
// to use. Nesting is structural, not special-cased -- an audio unit's
// Connections can itself route into a child audio unit's interface ports.

use std::collections::HashMap;

use crate::device::connections::Connections;
use crate::device::{Device, DeviceId};

/// Fixed interface port numbers every audio unit exposes to its parent
/// graph: one input (effects only) and one output.
pub const AU_IN_PORT: u8 = 0;
pub const AU_OUT_PORT: u8 = 0;

pub struct AudioUnit {
    pub id: u32,
    pub is_instrument: bool,
    pub devices: HashMap<DeviceId, Device>,
    pub connections: Connections,
    /// Named processor devices by type tag, for `proc_NN` key routing.
    pub proc_table: HashMap<u32, DeviceId>,
    /// Nested audio units (effects chained inside an instrument, or a
    /// sub-instrument of a layered audio unit), by `au_NN` index. Retained
    /// for model-data organisation; the render graph built by
    /// `Module::build_render_graph` flattens one level of processors per
    /// audio unit and does not recurse into these (see DESIGN.md).
    pub au_table: HashMap<u32, AudioUnit>,
    /// Raw edges for this audio unit's internal connections, in terms of
    /// `proc_NN` indices: `(from_idx, from_port, to_idx, to_port)`.
    /// `to_idx == AU_SINK` routes to the audio unit's own output port.
    pub edges: Vec<(u32, u8, u32, u8)>,
}

pub const AU_SINK: u32 = u32::MAX;

impl AudioUnit {
    pub fn new(id: u32, is_instrument: bool) -> Self {
        Self {
            id,
            is_instrument,
            devices: HashMap::new(),
            connections: Connections::default(),
            proc_table: HashMap::new(),
            au_table: HashMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn processor_device(&self, proc_index: u32) -> Option<&Device> {
        self.proc_table.get(&proc_index).and_then(|id| self.devices.get(id))
    }

    pub fn nested(&self, au_index: u32) -> Option<&AudioUnit> {
        self.au_table.get(&au_index)
    }

    pub fn nested_mut(&mut self, au_index: u32) -> Option<&mut AudioUnit> {
        self.au_table.get_mut(&au_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_audio_unit_starts_empty() {
        let au = AudioUnit::new(0, true);
        assert!(au.devices.is_empty());
        assert!(au.connections.is_empty());
        assert!(au.nested(0).is_none());
    }
}
