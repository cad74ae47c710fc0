// src/pattern.rs
//
// Musical score data: a Pattern is a fixed length (in beats) holding one
// Column per channel, each a time-ordered list of Triggers. TrackList and
// OrderList place pattern instances onto the timeline -- a pattern can
// appear more than once (hence "instance") at different track positions,
// each instance independently addressable via `PatInstRef`.

use std::collections::HashMap;

use crate::tstamp::Tstamp;
use crate::value::{PatInstRef, Value};

#[derive(Debug, Clone)]
pub struct Trigger {
    pub pos: Tstamp,
    pub event_name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Column {
    /// Kept sorted by `pos`; Cgiter relies on this ordering.
    triggers: Vec<Trigger>,
}

impl Column {
    pub fn insert(&mut self, trigger: Trigger) {
        let idx = self.triggers.partition_point(|t| t.pos <= trigger.pos);
        self.triggers.insert(idx, trigger);
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Index of the first trigger at or after `pos`.
    pub fn from_pos(&self, pos: Tstamp) -> usize {
        self.triggers.partition_point(|t| t.pos < pos)
    }
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub length: Tstamp,
    pub columns: Vec<Column>,
}

impl Pattern {
    pub fn new(length: Tstamp, num_columns: usize) -> Self {
        Self {
            length,
            columns: vec![Column::default(); num_columns],
        }
    }
}

/// One placement of a pattern instance at a track position.
#[derive(Debug, Clone, Copy)]
pub struct OrderListEntry {
    pub system_pos: u32,
    pub pat_inst: PatInstRef,
}

#[derive(Debug, Clone, Default)]
pub struct OrderList {
    entries: Vec<OrderListEntry>,
}

impl OrderList {
    pub fn push(&mut self, entry: OrderListEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[OrderListEntry] {
        &self.entries
    }

    pub fn at(&self, system_pos: u32) -> Option<&OrderListEntry> {
        self.entries.iter().find(|e| e.system_pos == system_pos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One track's order list, keyed by track number. A song consists of
/// however many tracks the model declares; playback walks system
/// positions within the currently selected track (or all tracks, in
/// song-playback mode).
#[derive(Debug, Clone, Default)]
pub struct TrackList {
    tracks: HashMap<u32, OrderList>,
}

impl TrackList {
    pub fn set_track(&mut self, track: u32, order_list: OrderList) {
        self.tracks.insert(track, order_list);
    }

    pub fn track(&self, track: u32) -> Option<&OrderList> {
        self.tracks.get(&track)
    }

    pub fn track_numbers(&self) -> Vec<u32> {
        let mut ts: Vec<u32> = self.tracks.keys().copied().collect();
        ts.sort_unstable();
        ts
    }
}

/// A fully resolved playback position: track, system (order-list index),
/// and offset within the current pattern instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub track: u32,
    pub system: u32,
    pub pat_offset: Tstamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_insert_keeps_sorted_order() {
        let mut col = Column::default();
        col.insert(Trigger { pos: Tstamp::from_beats(2), event_name: "b".into(), args: Value::None });
        col.insert(Trigger { pos: Tstamp::from_beats(1), event_name: "a".into(), args: Value::None });
        let names: Vec<_> = col.triggers().iter().map(|t| t.event_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn from_pos_finds_first_trigger_at_or_after() {
        let mut col = Column::default();
        col.insert(Trigger { pos: Tstamp::from_beats(0), event_name: "a".into(), args: Value::None });
        col.insert(Trigger { pos: Tstamp::from_beats(4), event_name: "b".into(), args: Value::None });
        assert_eq!(col.from_pos(Tstamp::from_beats(1)), 1);
        assert_eq!(col.from_pos(Tstamp::from_beats(4)), 1);
    }

    #[test]
    fn order_list_looks_up_by_system_position() {
        let mut ol = OrderList::default();
        ol.push(OrderListEntry { system_pos: 0, pat_inst: PatInstRef { pattern: 3, instance: 0 } });
        assert_eq!(ol.at(0).unwrap().pat_inst.pattern, 3);
        assert!(ol.at(1).is_none());
    }
}
