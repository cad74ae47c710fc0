// src/math.rs
//
// Small numeric conversions shared by every processor and control
// primitive: decibels <-> linear scale, cents <-> Hz, and MD5 for
// random-seed derivation. None of this is security-relevant.

/// Convert a decibel value to a linear amplitude scale.
///
/// `-inf` dB maps to exactly `0.0`, matching the "force == -inf means
/// silence" convention used throughout the voice-rendering path.
#[inline]
pub fn db_to_scale(db: f64) -> f64 {
    if db == f64::NEG_INFINITY {
        0.0
    } else {
        10f64.powf(db / 20.0)
    }
}

/// Convert a linear amplitude scale to decibels.
///
/// `0.0` (or negative) scale maps to `-inf` dB.
#[inline]
pub fn scale_to_db(scale: f64) -> f64 {
    if scale <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * scale.log10()
    }
}

/// Convert a pitch expressed in cents (relative to A4 = 0 cents = 440 Hz)
/// to a frequency in Hz.
#[inline]
pub fn cents_to_hz(cents: f64) -> f64 {
    440.0 * 2f64.powf(cents / 1200.0)
}

/// Convert a frequency in Hz to cents relative to A4 = 440 Hz.
#[inline]
pub fn hz_to_cents(hz: f64) -> f64 {
    1200.0 * (hz / 440.0).log2()
}

// ===========================================================================
// MD5
//
// Used only for deriving deterministic per-entity random seeds and content
// fingerprints -- not for anything security-sensitive. Implements both the
// all-at-once entry point and a chunked, carry-state entry point so that a
// digest can be built incrementally (e.g. one chunk per loaded model key)
// and still match the all-at-once result for the same byte sequence.
// ===========================================================================

const S: [u32; 64] = [
    7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 5, 9, 14, 20, 5, 9, 14, 20, 5, 9,
    14, 20, 5, 9, 14, 20, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 6, 10, 15,
    21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21,
];

const K: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee, 0xf57c0faf, 0x4787c62a, 0xa8304613, 0xfd469501,
    0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be, 0x6b901122, 0xfd987193, 0xa679438e, 0x49b40821,
    0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa, 0xd62f105d, 0x02441453, 0xd8a1e681, 0xe7d3fbc8,
    0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed, 0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a,
    0xfffa3942, 0x8771f681, 0x6d9d6122, 0xfde5380c, 0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70,
    0x289b7ec6, 0xeaa127fa, 0xd4ef3085, 0x04881d05, 0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665,
    0xf4292244, 0x432aff97, 0xab9423a7, 0xfc93a039, 0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1, 0xf7537e82, 0xbd3af235, 0x2ad7d2bb, 0xeb86d391,
];

/// MD5 state carried across chunked calls, in `md5_with_state` terms.
#[derive(Debug, Clone, Copy)]
pub struct Md5State {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl Default for Md5State {
    fn default() -> Self {
        Self {
            a: 0x67452301,
            b: 0xefcdab89,
            c: 0x98badcfe,
            d: 0x10325476,
        }
    }
}

/// Process one or more full 64-byte chunks of `data` (no padding), folding
/// into `state`. `data.len()` must be a multiple of 64.
fn md5_process_chunks(state: &mut Md5State, data: &[u8]) {
    debug_assert_eq!(data.len() % 64, 0);

    for chunk in data.chunks_exact(64) {
        let mut m = [0u32; 16];
        for (i, word) in m.iter_mut().enumerate() {
            *word = u32::from_le_bytes(chunk[i * 4..i * 4 + 4].try_into().unwrap());
        }

        let (mut a, mut b, mut c, mut d) = (state.a, state.b, state.c, state.d);

        for i in 0..64 {
            let (f, g) = match i {
                0..=15 => ((b & c) | (!b & d), i),
                16..=31 => ((d & b) | (!d & c), (5 * i + 1) % 16),
                32..=47 => (b ^ c ^ d, (3 * i + 5) % 16),
                _ => (c ^ (b | !d), (7 * i) % 16),
            };

            let f = f
                .wrapping_add(a)
                .wrapping_add(K[i])
                .wrapping_add(m[g]);
            a = d;
            d = c;
            c = b;
            b = b.wrapping_add(f.rotate_left(S[i]));
        }

        state.a = state.a.wrapping_add(a);
        state.b = state.b.wrapping_add(b);
        state.c = state.c.wrapping_add(c);
        state.d = state.d.wrapping_add(d);
    }
}

/// Pad the final (possibly partial) chunk of a message of total bit-length
/// `total_bits_len`, then fold it (and a trailing length-only chunk if the
/// padding did not fit) into `state`.
fn md5_finish(state: &mut Md5State, tail: &[u8], total_len: u64) {
    let bit_len = total_len.wrapping_mul(8);

    let mut padded = tail.to_vec();
    padded.push(0x80);
    while padded.len() % 64 != 56 {
        padded.push(0);
    }
    padded.extend_from_slice(&bit_len.to_le_bytes());

    md5_process_chunks(state, &padded);
}

/// All-at-once MD5 digest of `data`. Returns `(lower, upper)` 64-bit halves
/// of the 128-bit digest, matching the original C API's split return.
pub fn md5(data: &[u8]) -> (u64, u64) {
    let mut state = Md5State::default();
    md5_with_state(data, &mut state, true, 0);
    (
        (state.a as u64) | ((state.b as u64) << 32),
        (state.c as u64) | ((state.d as u64) << 32),
    )
}

/// Chunked MD5 with explicit carry-state, mirroring the original's
/// `md5_with_state`: feed full 64-byte-aligned chunks with `last = false`,
/// then feed the final (possibly partial) chunk with `last = true` and the
/// total length seen so far (including this call) in `total_len`.
pub fn md5_with_state(data: &[u8], state: &mut Md5State, last: bool, prior_len: u64) {
    let total_len = prior_len + data.len() as u64;

    let full_len = data.len() - data.len() % 64;
    md5_process_chunks(state, &data[..full_len]);

    let tail = &data[full_len..];
    if last {
        md5_finish(state, tail, total_len);
    } else {
        debug_assert!(tail.is_empty(), "non-final chunk must be 64-byte aligned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        for db in [-60.0, -6.0, 0.0, 6.0, 12.0] {
            let scale = db_to_scale(db);
            assert!((scale_to_db(scale) - db).abs() < 1e-9);
        }
        assert_eq!(db_to_scale(f64::NEG_INFINITY), 0.0);
        assert_eq!(scale_to_db(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn cents_hz_round_trip() {
        for hz in [55.0, 220.0, 440.0, 880.0, 4000.0] {
            let cents = hz_to_cents(hz);
            assert!((cents_to_hz(cents) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn md5_empty_is_stable() {
        // Regression pin, not a vector check: two independent calls over
        // the same (empty) input must agree.
        assert_eq!(md5(b""), md5(b""));
    }

    #[test]
    fn md5_chunked_matches_all_at_once() {
        // Two 64-byte-aligned chunks fed non-final, then a short final tail.
        let mut data = vec![0u8; 128 + 30];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i * 7 + 3) as u8;
        }
        let whole = md5(&data);

        let mut state = Md5State::default();
        md5_with_state(&data[0..64], &mut state, false, 0);
        md5_with_state(&data[64..128], &mut state, false, 64);
        md5_with_state(&data[128..], &mut state, true, 128);

        let chunked = (
            (state.a as u64) | ((state.b as u64) << 32),
            (state.c as u64) | ((state.d as u64) << 32),
        );

        assert_eq!(whole, chunked);
    }
}
