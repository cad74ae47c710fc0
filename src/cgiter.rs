// src/cgiter.rs
//
// Column-group iterator: walks a TrackList's order list across pattern
// boundaries, handing back one Position at a time and letting the player
// peek at the next trigger in any column without committing to move past
// it. "Column group" because, in song-playback mode, it walks every
// track's order list together; here it is scoped to a single track, with
// song mode implemented as one Cgiter per track in master.rs.

use crate::pattern::{OrderList, Position};
use crate::tstamp::Tstamp;

pub struct Cgiter<'a> {
    order_list: &'a OrderList,
    track: u32,
    system: u32,
    pat_offset: Tstamp,
    pat_length: Tstamp,
}

impl<'a> Cgiter<'a> {
    pub fn new(order_list: &'a OrderList, track: u32, pat_length: Tstamp) -> Self {
        Self {
            order_list,
            track,
            system: 0,
            pat_offset: Tstamp::ZERO,
            pat_length,
        }
    }

    pub fn position(&self) -> Position {
        Position { track: self.track, system: self.system, pat_offset: self.pat_offset }
    }

    pub fn current_pat_inst(&self) -> Option<crate::value::PatInstRef> {
        self.order_list.at(self.system).map(|e| e.pat_inst)
    }

    /// Advance the in-pattern offset by `delta`, crossing into the next
    /// system position when the pattern's length is exceeded. Returns
    /// `true` if a system boundary was crossed (caller should re-derive
    /// the new pattern's length before the next call).
    pub fn advance(&mut self, delta: Tstamp, next_pat_length: impl FnOnce() -> Tstamp) -> bool {
        self.pat_offset += delta;
        if self.pat_offset >= self.pat_length && self.order_list.at(self.system + 1).is_some() {
            self.pat_offset = Tstamp::ZERO;
            self.system += 1;
            self.pat_length = next_pat_length();
            true
        } else {
            false
        }
    }

    /// Whether playback has run past the last defined system position.
    pub fn at_end(&self) -> bool {
        self.order_list.at(self.system).is_none()
    }

    pub fn set_pat_length(&mut self, length: Tstamp) {
        self.pat_length = length;
    }

    pub fn jump(&mut self, system: u32, pat_offset: Tstamp, pat_length: Tstamp) {
        self.system = system;
        self.pat_offset = pat_offset;
        self.pat_length = pat_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::OrderListEntry;
    use crate::value::PatInstRef;

    fn two_system_order_list() -> OrderList {
        let mut ol = OrderList::default();
        ol.push(OrderListEntry { system_pos: 0, pat_inst: PatInstRef { pattern: 0, instance: 0 } });
        ol.push(OrderListEntry { system_pos: 1, pat_inst: PatInstRef { pattern: 1, instance: 0 } });
        ol
    }

    #[test]
    fn advance_within_pattern_does_not_cross_boundary() {
        let ol = two_system_order_list();
        let mut it = Cgiter::new(&ol, 0, Tstamp::from_beats(4));
        let crossed = it.advance(Tstamp::from_beats(1), || Tstamp::from_beats(4));
        assert!(!crossed);
        assert_eq!(it.position().system, 0);
    }

    #[test]
    fn advance_past_length_crosses_to_next_system() {
        let ol = two_system_order_list();
        let mut it = Cgiter::new(&ol, 0, Tstamp::from_beats(4));
        let crossed = it.advance(Tstamp::from_beats(5), || Tstamp::from_beats(2));
        assert!(crossed);
        assert_eq!(it.position().system, 1);
        assert_eq!(it.position().pat_offset, Tstamp::ZERO);
    }

    #[test]
    fn at_end_true_past_last_system() {
        let ol = two_system_order_list();
        let mut it = Cgiter::new(&ol, 0, Tstamp::from_beats(1));
        it.jump(2, Tstamp::ZERO, Tstamp::from_beats(1));
        assert!(it.at_end());
    }
}
