//! ChaCha20 DRNG state machine
//!
//! This module layers the deterministic random bit generator on top of the
//! ChaCha20 permutation: state layout, seed injection, the backtracking-
//! resistant state update, and byte-stream generation in both output modes.
//!
//! The generator state is exactly one permutation block wide (64 bytes),
//! which is twice the key width. Each state update XORs one key width of
//! permutation output into the key and advances the nonce, so the state
//! transformation is one-way: recovering a previous key from the current
//! state requires inverting the permutation.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::permutation::{self, CHACHA20_CONSTANTS};
use super::{CHACHA20_BLOCK_SIZE, CHACHA20_BLOCK_WORDS, CHACHA20_KEY_SIZE, CHACHA20_KEY_WORDS};
use crate::backend::{
    BackendError, DrngBackend, DrngState, OutputMode, SECURITY_STRENGTH_BYTES,
};
use crate::os;

/// ChaCha20 generator state, laid out as in RFC 8439 section 2.3.
///
/// The whole state is one permutation block: four fixed domain-separation
/// constants, the 256-bit secret key, the 32-bit block counter, and the
/// 96-bit nonce. The counter's start value is unspecified by the design and
/// is never reset; the nonce is incremented with carry on every state
/// update to prevent permutation-output reuse across updates.
///
/// The state is zeroized on drop; `key` is secret material.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub(crate) struct ChaCha20Drng {
    constants: [u32; 4],
    key: [u32; CHACHA20_KEY_WORDS],
    counter: u32,
    nonce: [u32; 3],
}

const _: () = assert!(size_of::<ChaCha20Drng>() == CHACHA20_BLOCK_SIZE);
const _: () = assert!(CHACHA20_BLOCK_SIZE == 2 * CHACHA20_KEY_SIZE);

/// Rejects requests whose length is not representable in 32 bits.
///
/// The block counter is 32 bits wide and is only re-anchored by the state
/// update at the end of a request, so a longer request could wrap the
/// counter and repeat permutation blocks within a single call.
fn check_request_len(len: usize) -> Result<(), BackendError> {
    if len > u32::MAX as usize {
        return Err(BackendError::RequestTooLarge);
    }

    Ok(())
}

/// Serializes one block of permutation output into little-endian bytes.
fn words_to_le_bytes(words: &[u32], out: &mut [u8]) {
    out.chunks_exact_mut(4).zip(words).for_each(|(chunk, word)| {
        chunk.copy_from_slice(&word.to_le_bytes());
    });
}

impl ChaCha20Drng {
    /// Creates a freshly initialized generator state.
    ///
    /// Mixes the domain constant into `constants` and folds a coarse time
    /// source plus best-effort system randomness into every key and nonce
    /// word, followed by one update with no seed bytes to scramble the
    /// initial mixing. The resulting state is operational but untrusted
    /// until seeded by the entropy-pool collaborator.
    pub(crate) fn new() -> Self {
        let mut state = Self {
            constants: CHACHA20_CONSTANTS,
            key: [0u32; CHACHA20_KEY_WORDS],
            counter: 0,
            nonce: [0u32; 3],
        };

        let mut pool = [0u8; (CHACHA20_KEY_WORDS + 3) * 4];
        let have_sys = os::sys_random(&mut pool);

        let words = state.key.iter_mut().chain(state.nonce.iter_mut());
        for (i, word) in words.enumerate() {
            let now = os::coarse_time();

            *word ^= now as u32;
            *word ^= (now >> 32) as u32;
            if have_sys {
                *word ^= u32::from_le_bytes(pool[i * 4..(i + 1) * 4].try_into().unwrap());
            }
        }
        pool.zeroize();

        state.update(None, CHACHA20_BLOCK_WORDS as u32);

        log::info!("ChaCha20 DRNG core initialized");

        state
    }

    /// Produces one permutation block into `out` and advances the counter.
    fn block_into(&mut self, out: &mut [u32; CHACHA20_BLOCK_WORDS]) {
        let mut input = [0u32; CHACHA20_BLOCK_WORDS];

        input[0..4].copy_from_slice(&self.constants);
        input[4..12].copy_from_slice(&self.key);
        input[12] = self.counter;
        input[13..16].copy_from_slice(&self.nonce);

        permutation::permute_into(&input, out);
        input.zeroize();

        self.counter = self.counter.wrapping_add(1);
    }

    /// Advances the state for backtracking resistance.
    ///
    /// If the caller still holds unused permutation-output words from its
    /// own last block (`leftover` with `used_words` already consumed), the
    /// next key width of those words is XORed directly into the key,
    /// avoiding a redundant permutation call. Otherwise one fresh block is
    /// generated and its first key width of words is XORed in; the scratch
    /// block is zeroized immediately after use.
    ///
    /// The nonce is then incremented as a little-endian 3-word counter with
    /// carry propagation. The block counter is left untouched: its start
    /// value is unspecified and only the permutation consumes it.
    fn update(&mut self, leftover: Option<&[u32; CHACHA20_BLOCK_WORDS]>, used_words: u32) {
        match leftover {
            Some(buf) if used_words as usize <= CHACHA20_KEY_WORDS => {
                let unused = &buf[used_words as usize..used_words as usize + CHACHA20_KEY_WORDS];

                self.key.iter_mut().zip(unused).for_each(|(k, w)| *k ^= *w);
            }
            _ => {
                let mut fresh = [0u32; CHACHA20_BLOCK_WORDS];
                self.block_into(&mut fresh);

                self.key.iter_mut().zip(&fresh).for_each(|(k, w)| *k ^= *w);
                fresh.zeroize();
            }
        }

        self.nonce[0] = self.nonce[0].wrapping_add(1);
        if self.nonce[0] == 0 {
            self.nonce[1] = self.nonce[1].wrapping_add(1);
            if self.nonce[1] == 0 {
                self.nonce[2] = self.nonce[2].wrapping_add(1);
            }
        }
    }

    /// Standard generation: raw permutation blocks as the output stream.
    fn generate_standard(&mut self, out: &mut [u8]) -> u32 {
        let mut aligned = [0u32; CHACHA20_BLOCK_WORDS];
        let mut used = CHACHA20_BLOCK_WORDS as u32;

        let mut blocks = out.chunks_exact_mut(CHACHA20_BLOCK_SIZE);
        for block in blocks.by_ref() {
            self.block_into(&mut aligned);
            words_to_le_bytes(&aligned, block);
        }

        let tail = blocks.into_remainder();
        if !tail.is_empty() {
            self.block_into(&mut aligned);

            let mut bytes = [0u8; CHACHA20_BLOCK_SIZE];
            words_to_le_bytes(&aligned, &mut bytes);
            tail.copy_from_slice(&bytes[..tail.len()]);
            bytes.zeroize();

            used = tail.len().div_ceil(4) as u32;
        }

        // With no partial tail, `used` covers the whole block and forces
        // the fresh-permutation path inside update.
        self.update(Some(&aligned), used);
        aligned.zeroize();

        out.len() as u32
    }

    /// Full-strength generation: every permutation block is folded in half
    /// via XOR before emission, so the output can transport 1 bit of
    /// entropy per data bit provided the state was seeded with a full key
    /// width of entropy. Throughput is halved accordingly.
    fn generate_fold(&mut self, out: &mut [u8]) -> u32 {
        let mut aligned = [0u32; CHACHA20_BLOCK_WORDS];
        let mut bytes = [0u8; CHACHA20_BLOCK_SIZE / 2];

        for chunk in out.chunks_mut(CHACHA20_BLOCK_SIZE / 2) {
            self.block_into(&mut aligned);

            // fold output in half
            for i in 0..CHACHA20_BLOCK_WORDS / 2 {
                aligned[i] ^= aligned[i + CHACHA20_BLOCK_WORDS / 2];
            }

            words_to_le_bytes(&aligned[..CHACHA20_BLOCK_WORDS / 2], &mut bytes);
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }

        bytes.zeroize();
        aligned.zeroize();

        // Folded output must never feed the key update.
        self.update(None, CHACHA20_BLOCK_WORDS as u32);

        out.len() as u32
    }
}

impl DrngState for ChaCha20Drng {
    /// Injects entropy by XOR-folding the input into the key in chunks of
    /// at most the key width, with one state update after every chunk
    /// (including a final partial one) to break potential dependencies
    /// between successive input chunks.
    fn seed(&mut self, input: &[u8]) {
        for chunk in input.chunks(CHACHA20_KEY_SIZE) {
            for (i, byte) in chunk.iter().enumerate() {
                self.key[i / 4] ^= u32::from(*byte) << (8 * (i % 4));
            }

            self.update(None, CHACHA20_BLOCK_WORDS as u32);
        }
    }

    fn generate(&mut self, out: &mut [u8], mode: OutputMode) -> Result<u32, BackendError> {
        check_request_len(out.len())?;

        let written = match mode {
            OutputMode::Standard => self.generate_standard(out),
            OutputMode::FullEntropy => self.generate_fold(out),
        };

        Ok(written)
    }
}

/// The built-in ChaCha20 DRNG backend.
///
/// A stateless capability record; all generator state lives in the
/// [`ChaCha20Drng`] instances it allocates. SHA-256 serves as the
/// associated conditioning hash.
pub struct ChaCha20Backend;

impl DrngBackend for ChaCha20Backend {
    fn name(&self) -> &'static str {
        "ChaCha20 DRNG"
    }

    fn hash_name(&self) -> &'static str {
        "SHA-256"
    }

    fn hash_digest_size(&self) -> u32 {
        32
    }

    fn hash_buffer(&self, input: &[u8], digest: &mut [u8]) {
        let out = Sha256::digest(input);

        digest[..out.len()].copy_from_slice(&out);
    }

    fn alloc(&self, security_strength: u32) -> Result<Box<dyn DrngState>, BackendError> {
        if security_strength > SECURITY_STRENGTH_BYTES {
            log::error!(
                "security strength of ChaCha20 DRNG ({} bits) lower than requested ({} bits)",
                SECURITY_STRENGTH_BYTES * 8,
                security_strength * 8
            );
            return Err(BackendError::InvalidSecurityStrength {
                requested: security_strength,
                native: SECURITY_STRENGTH_BYTES,
            });
        }

        if security_strength < SECURITY_STRENGTH_BYTES {
            log::warn!(
                "security strength of ChaCha20 DRNG ({} bits) higher than requested ({} bits)",
                SECURITY_STRENGTH_BYTES * 8,
                security_strength * 8
            );
        }

        Ok(Box::new(ChaCha20Drng::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a state with fixed key, counter, and nonce, bypassing the
    /// randomized initialization so tests are reproducible.
    fn raw_state(key: [u32; CHACHA20_KEY_WORDS], counter: u32, nonce: [u32; 3]) -> ChaCha20Drng {
        ChaCha20Drng {
            constants: CHACHA20_CONSTANTS,
            key,
            counter,
            nonce,
        }
    }

    /// RFC 8439 section 2.3.2 key as little-endian words.
    const RFC8439_KEY: [u32; CHACHA20_KEY_WORDS] = [
        0x03020100, 0x07060504, 0x0b0a0908, 0x0f0e0d0c, 0x13121110, 0x17161514, 0x1b1a1918,
        0x1f1e1d1c,
    ];

    #[test]
    fn test_block_matches_rfc8439_vector() {
        let mut state = raw_state(RFC8439_KEY, 1, [0x09000000, 0x4a000000, 0x00000000]);
        let mut block = [0u32; CHACHA20_BLOCK_WORDS];

        state.block_into(&mut block);

        let expected: [u32; CHACHA20_BLOCK_WORDS] = [
            0xe4e7f110, 0x15593bd1, 0x1fdd0f50, 0xc47120a3, 0xc7f4d1c7, 0x0368c033, 0x9aaa2204,
            0x4e6cd4c3, 0x466482d2, 0x09aa9f07, 0x05d7c214, 0xa2028bd9, 0xd19c12b5, 0xb94e16de,
            0xe883d0cb, 0x4e3c50a2,
        ];

        assert_eq!(block, expected);
        assert_eq!(state.counter, 2);
    }

    #[test]
    fn test_update_carry_propagates_to_second_word() {
        let mut state = raw_state([0u32; CHACHA20_KEY_WORDS], 0, [0xFFFFFFFF, 0, 0]);

        state.update(None, CHACHA20_BLOCK_WORDS as u32);

        assert_eq!(state.nonce, [0, 1, 0]);
    }

    #[test]
    fn test_update_carry_propagates_to_third_word() {
        let mut state = raw_state([0u32; CHACHA20_KEY_WORDS], 0, [0xFFFFFFFF, 0xFFFFFFFF, 0]);

        state.update(None, CHACHA20_BLOCK_WORDS as u32);

        assert_eq!(state.nonce, [0, 0, 1]);
    }

    #[test]
    fn test_update_leaves_counter_untouched() {
        let mut state = raw_state([0u32; CHACHA20_KEY_WORDS], 7, [0, 0, 0]);
        let leftover = [0xAAu32; CHACHA20_BLOCK_WORDS];

        state.update(Some(&leftover), 0);

        assert_eq!(state.counter, 7);
        assert_eq!(state.nonce, [1, 0, 0]);
    }

    #[test]
    fn test_update_consumes_unused_leftover_words() {
        let mut state = raw_state([0u32; CHACHA20_KEY_WORDS], 0, [0, 0, 0]);
        let mut leftover = [0u32; CHACHA20_BLOCK_WORDS];
        for (i, word) in leftover.iter_mut().enumerate() {
            *word = i as u32 + 1;
        }

        state.update(Some(&leftover), 4);

        let expected: [u32; CHACHA20_KEY_WORDS] = [5, 6, 7, 8, 9, 10, 11, 12];
        assert_eq!(state.key, expected);
    }

    #[test]
    fn test_seed_performs_one_update_per_chunk() {
        // The nonce advances by exactly one per internal update, so it
        // counts the update calls.
        for (len, updates) in [(0usize, 0u32), (1, 1), (32, 1), (33, 2), (64, 2), (65, 3)] {
            let mut state = raw_state([0u32; CHACHA20_KEY_WORDS], 0, [0, 0, 0]);

            state.seed(&vec![0x5Au8; len]);

            assert_eq!(state.nonce[0], updates, "input length {len}");
        }
    }

    #[test]
    fn test_seed_empty_input_is_noop() {
        let mut state = raw_state(RFC8439_KEY, 3, [9, 8, 7]);

        state.seed(&[]);

        assert_eq!(state.key, RFC8439_KEY);
        assert_eq!(state.counter, 3);
        assert_eq!(state.nonce, [9, 8, 7]);
    }

    #[test]
    fn test_generate_writes_exact_length() {
        for len in [0usize, 1, 3, 31, 32, 63, 64, 65, 128, 131] {
            let mut state = raw_state(RFC8439_KEY, 0, [0, 0, 0]);
            let mut out = vec![0u8; len];

            let written = state.generate(&mut out, OutputMode::Standard).unwrap();

            assert_eq!(written as usize, len);
        }
    }

    #[test]
    fn test_generate_zero_length_still_updates_state() {
        let mut state = raw_state(RFC8439_KEY, 0, [0, 0, 0]);
        let key_before = state.key;

        let written = state.generate(&mut [], OutputMode::Standard).unwrap();

        assert_eq!(written, 0);
        assert_eq!(state.nonce, [1, 0, 0]);
        assert_ne!(state.key, key_before);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let mut a = raw_state(RFC8439_KEY, 5, [1, 2, 3]);
        let mut b = raw_state(RFC8439_KEY, 5, [1, 2, 3]);
        let mut out_a = [0u8; 100];
        let mut out_b = [0u8; 100];

        a.seed(b"some injected entropy");
        b.seed(b"some injected entropy");
        a.generate(&mut out_a, OutputMode::Standard).unwrap();
        b.generate(&mut out_b, OutputMode::Standard).unwrap();

        assert_eq!(out_a, out_b);

        let mut tail_a = [0u8; 37];
        let mut tail_b = [0u8; 37];
        a.generate(&mut tail_a, OutputMode::FullEntropy).unwrap();
        b.generate(&mut tail_b, OutputMode::FullEntropy).unwrap();

        assert_eq!(tail_a, tail_b);
    }

    #[test]
    fn test_fold_mode_xors_block_halves() {
        let mut standard = raw_state(RFC8439_KEY, 0, [0, 0, 0]);
        let mut folded = raw_state(RFC8439_KEY, 0, [0, 0, 0]);
        let mut raw = [0u8; CHACHA20_BLOCK_SIZE];
        let mut fold = [0u8; CHACHA20_BLOCK_SIZE / 2];

        standard.generate(&mut raw, OutputMode::Standard).unwrap();
        folded.generate(&mut fold, OutputMode::FullEntropy).unwrap();

        for i in 0..fold.len() {
            assert_eq!(fold[i], raw[i] ^ raw[i + CHACHA20_BLOCK_SIZE / 2]);
        }
    }

    #[test]
    fn test_successive_outputs_differ() {
        let mut state = raw_state(RFC8439_KEY, 0, [0, 0, 0]);
        let mut first = [0u8; 64];
        let mut second = [0u8; 64];

        state.generate(&mut first, OutputMode::Standard).unwrap();
        state.generate(&mut second, OutputMode::Standard).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_generate_request_length_is_bounded() {
        // A request longer than u32::MAX bytes is impractical to allocate,
        // so the length guard is exercised directly.
        assert_eq!(check_request_len(0), Ok(()));
        assert_eq!(check_request_len(u32::MAX as usize), Ok(()));
        assert_eq!(
            check_request_len(u32::MAX as usize + 1),
            Err(BackendError::RequestTooLarge)
        );
    }

    #[test]
    fn test_zeroize_clears_every_word() {
        let mut state = ChaCha20Drng::new();
        state.seed(b"secret material that must not linger");

        state.zeroize();

        assert_eq!(state.constants, [0u32; 4]);
        assert_eq!(state.key, [0u32; CHACHA20_KEY_WORDS]);
        assert_eq!(state.counter, 0);
        assert_eq!(state.nonce, [0u32; 3]);
    }

    #[test]
    fn test_state_zeroizes_on_deallocation() {
        // Dropping a state runs the same zeroize as the explicit call
        // checked above; reading freed memory to observe it would be
        // unsound, so the drop wiring is pinned at the type level.
        fn zeroized_on_drop<T: ZeroizeOnDrop>() {}

        zeroized_on_drop::<ChaCha20Drng>();
    }

    #[test]
    fn test_fresh_states_differ() {
        let a = ChaCha20Drng::new();
        let b = ChaCha20Drng::new();

        assert_ne!(a.key, b.key);
    }
}
