// src/random.rs
//
// Deterministic, seedable random source. Every channel and every voice
// carries its own instance so that reseeding the top-level model seed
// reproduces an identical performance regardless of playback history.
//
// Per-entity seeds are derived from a base seed plus an entity index via
// MD5 (see math.rs) rather than sharing one global generator or drawing
// fresh entropy -- determinism is the whole point.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::math::md5;

/// A deterministic PRNG source, reseedable from a 64-bit base seed plus an
/// entity tag (e.g. channel number, or voice reservation index).
#[derive(Clone)]
pub struct Random {
    rng: SmallRng,
}

impl Random {
    /// Derive a fresh generator for `entity_tag` under `base_seed`.
    pub fn derive(base_seed: u64, entity_tag: u64) -> Self {
        let mut buf = [0u8; 16];
        buf[0..8].copy_from_slice(&base_seed.to_le_bytes());
        buf[8..16].copy_from_slice(&entity_tag.to_le_bytes());
        let (lower, _upper) = md5(&buf);
        Self {
            rng: SmallRng::seed_from_u64(lower),
        }
    }

    /// Reseed in place, e.g. when a channel is reassigned or a voice group
    /// is reserved for a new note.
    pub fn reseed(&mut self, base_seed: u64, entity_tag: u64) {
        *self = Self::derive(base_seed, entity_tag);
    }

    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform value in `[-1.0, 1.0)`, the common case for noise sources.
    #[inline]
    pub fn next_signal(&mut self) -> f32 {
        (self.rng.gen::<f32>() * 2.0) - 1.0
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::derive(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_and_tag_reproduce() {
        let mut a = Random::derive(42, 7);
        let mut b = Random::derive(42, 7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_tags_diverge() {
        let mut a = Random::derive(42, 1);
        let mut b = Random::derive(42, 2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn signal_range() {
        let mut r = Random::derive(1, 1);
        for _ in 0..1000 {
            let s = r.next_signal();
            assert!(s >= -1.0 && s < 1.0);
        }
    }
}
