// src/tstamp.rs
//
// Musical time. A Tstamp is an exact fraction of a beat: `beats` whole
// beats plus `rem` parts of BEAT_UNITS, so that the common subdivisions
// (halves, thirds, fifths, sevenths, ...) used by real patterns are exact
// rather than float-approximated.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Denominator for the `rem` field. Highly composite (divisible by every
/// integer from 1 through 12, plus 13, 16, 18, 20, ...) so that common
/// beat subdivisions land on an exact `rem` value.
pub const BEAT_UNITS: i64 = 882_161_280;

/// A musical timestamp: `beats` whole beats plus `rem` / [`BEAT_UNITS`] of
/// a beat. Always normalised so that `0 <= rem < BEAT_UNITS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Tstamp {
    pub beats: i64,
    pub rem: i32,
}

impl Tstamp {
    pub const ZERO: Tstamp = Tstamp { beats: 0, rem: 0 };

    /// Construct from raw components, normalising `rem` into range.
    pub fn new(beats: i64, rem: i64) -> Self {
        let mut t = Tstamp { beats, rem: 0 };
        t.add_rem(rem);
        t
    }

    pub fn from_beats(beats: i64) -> Self {
        Tstamp { beats, rem: 0 }
    }

    /// Fractional beats as an `f64`, for display / interop only -- never
    /// used internally for comparison or arithmetic.
    pub fn as_f64_beats(&self) -> f64 {
        self.beats as f64 + self.rem as f64 / BEAT_UNITS as f64
    }

    /// Fold a (possibly out-of-range, possibly negative) raw remainder
    /// into `self`, carrying whole beats in or out as needed.
    fn add_rem(&mut self, extra_rem: i64) {
        let total = self.rem as i64 + extra_rem;
        let carry = total.div_euclid(BEAT_UNITS);
        let rem = total.rem_euclid(BEAT_UNITS);
        self.beats += carry;
        self.rem = rem as i32;
    }

    /// Number of audio frames equivalent to this duration at the given
    /// tempo (beats per minute) and audio rate (frames per second).
    ///
    /// `frames = (beats + rem/BEAT_UNITS) * 60 * audio_rate / tempo`
    pub fn to_frames(&self, tempo: f64, audio_rate: f64) -> f64 {
        debug_assert!(tempo > 0.0);
        self.as_f64_beats() * 60.0 * audio_rate / tempo
    }

    /// Inverse of [`Tstamp::to_frames`]: the largest Tstamp whose frame
    /// length does not exceed `frames`, given the same tempo/rate.
    pub fn from_frames(frames: f64, tempo: f64, audio_rate: f64) -> Self {
        debug_assert!(tempo > 0.0 && audio_rate > 0.0);
        let beats = frames * tempo / (60.0 * audio_rate);
        let whole = beats.floor();
        let frac = beats - whole;
        Tstamp::new(whole as i64, (frac * BEAT_UNITS as f64).round() as i64)
    }

    pub fn is_zero(&self) -> bool {
        self.beats == 0 && self.rem == 0
    }
}

impl PartialOrd for Tstamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tstamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.beats.cmp(&other.beats).then(self.rem.cmp(&other.rem))
    }
}

impl Add for Tstamp {
    type Output = Tstamp;
    fn add(self, rhs: Tstamp) -> Tstamp {
        let mut out = Tstamp {
            beats: self.beats + rhs.beats,
            rem: self.rem,
        };
        out.add_rem(rhs.rem as i64);
        out
    }
}

impl AddAssign for Tstamp {
    fn add_assign(&mut self, rhs: Tstamp) {
        *self = *self + rhs;
    }
}

impl Sub for Tstamp {
    type Output = Tstamp;
    fn sub(self, rhs: Tstamp) -> Tstamp {
        let mut out = Tstamp {
            beats: self.beats - rhs.beats,
            rem: self.rem,
        };
        out.add_rem(-(rhs.rem as i64));
        out
    }
}

impl SubAssign for Tstamp {
    fn sub_assign(&mut self, rhs: Tstamp) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_overflowing_rem() {
        let t = Tstamp::new(0, BEAT_UNITS + 5);
        assert_eq!(t, Tstamp { beats: 1, rem: 5 });
    }

    #[test]
    fn normalises_negative_rem() {
        let t = Tstamp::new(1, -5);
        assert_eq!(t, Tstamp { beats: 0, rem: BEAT_UNITS as i32 - 5 });
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = Tstamp::new(1, 0);
        let b = Tstamp::new(0, BEAT_UNITS - 1);
        assert!(b < a);
    }

    #[test]
    fn addition_and_subtraction_are_exact_for_common_subdivisions() {
        let third = Tstamp::new(0, BEAT_UNITS / 3);
        let sum = third + third + third;
        assert_eq!(sum, Tstamp::from_beats(1));
    }

    #[test]
    fn frame_round_trip() {
        let t = Tstamp::new(2, BEAT_UNITS / 4);
        let frames = t.to_frames(120.0, 48_000.0);
        let back = Tstamp::from_frames(frames, 120.0, 48_000.0);
        // Allowed to lose sub-frame precision, but beats must match.
        assert_eq!(back.beats, t.beats);
    }

    #[test]
    fn rem_always_in_range() {
        let mut t = Tstamp::ZERO;
        for _ in 0..1000 {
            t += Tstamp::new(0, BEAT_UNITS / 7);
            assert!(t.rem >= 0 && (t.rem as i64) < BEAT_UNITS);
        }
    }
}
