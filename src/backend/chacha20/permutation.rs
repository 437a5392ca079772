//! ChaCha20 permutation
//!
//! This module provides a low-level, allocation-free implementation of the
//! ChaCha20 block transform as specified in RFC 8439. It operates on the
//! full 16-word state and includes the feed-forward addition, producing one
//! 64-byte permutation block per invocation.
//!
//! The caller owns state assembly (constants, key, counter, nonce) and
//! counter management; this module is a pure function of its input.

use super::CHACHA20_BLOCK_WORDS;

/// ChaCha20 constant words.
///
/// These values correspond to the ASCII string `"expand 32-byte k"` encoded
/// as little-endian `u32` words, as defined in RFC 8439. They are public,
/// fixed, and non-secret, and define the ChaCha20 permutation domain.
pub(crate) const CHACHA20_CONSTANTS: [u32; 4] = [
    0x6170_7865, // "expa"
    0x3320_646e, // "nd 3"
    0x7962_2d32, // "2-by"
    0x6b20_6574, // "te k"
];

/// Performs one ChaCha20 quarter round.
///
/// A quarter round mixes four 32-bit words of the internal state using
/// addition modulo 2³², XOR, and fixed left rotations. This operation is
/// the fundamental source of diffusion and non-linearity in ChaCha20.
///
/// The function is branchless and runs in constant time.
#[inline(always)]
fn quarter_round(state: &mut [u32; CHACHA20_BLOCK_WORDS], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(7);
}

/// Applies the full ChaCha20 permutation (20 rounds).
///
/// The permutation consists of 10 iterations, each performing 4 column
/// quarter rounds and 4 diagonal quarter rounds, the standard and
/// conservative security setting for ChaCha20.
fn rounds(state: &mut [u32; CHACHA20_BLOCK_WORDS]) {
    for _ in 0..10 {
        // Column rounds
        quarter_round(state, 0, 4, 8, 12);
        quarter_round(state, 1, 5, 9, 13);
        quarter_round(state, 2, 6, 10, 14);
        quarter_round(state, 3, 7, 11, 15);

        // Diagonal rounds
        quarter_round(state, 0, 5, 10, 15);
        quarter_round(state, 1, 6, 11, 12);
        quarter_round(state, 2, 7, 8, 13);
        quarter_round(state, 3, 4, 9, 14);
    }
}

/// Generates one permutation block from the given input state.
///
/// Runs the 20-round permutation over a copy of `input` and adds the
/// original state back in (feed-forward), writing the resulting 16 words
/// into `out`. The input state is left untouched; in particular the block
/// counter inside it is the caller's responsibility.
pub(crate) fn permute_into(
    input: &[u32; CHACHA20_BLOCK_WORDS],
    out: &mut [u32; CHACHA20_BLOCK_WORDS],
) {
    *out = *input;

    rounds(out);

    out.iter_mut().zip(input).for_each(|(o, i)| {
        *o = o.wrapping_add(*i);
    });
}
