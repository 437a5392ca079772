//! ChaCha20 DRNG backend
//!
//! This module implements the built-in DRNG algorithm: a deterministic
//! random bit generator built on the ChaCha20 permutation as specified in
//! RFC 8439.
//!
//! The implementation is deliberately split into two layers:
//!
//! - [`permutation`]
//!   The fixed-function ChaCha20 permutation: quarter rounds, the 20-round
//!   schedule, and the feed-forward addition. Branchless, constant time,
//!   and free of heap allocation.
//!
//! - [`drng`]
//!   The generator state machine layered on top of the permutation: seed
//!   injection by XOR-folding, backtracking-resistant state updates with a
//!   carry-propagating nonce increment, byte-stream generation in both the
//!   standard and the fold-in-half output modes, and state initialization
//!   and zeroization. This layer implements the backend capability traits.
//!
//! ## Design notes
//!
//! - The generator state is exactly one 64-byte permutation block: the four
//!   domain constants, the 256-bit key, the 32-bit block counter, and the
//!   96-bit nonce.
//! - After every generate or seed operation the key is irreversibly mixed
//!   with permutation output, so a later compromise of the state does not
//!   reveal past output.
//! - All secret-bearing scratch buffers are zeroized before return, and the
//!   whole state is zeroized when deallocated.

pub(crate) mod drng;
pub(crate) mod permutation;

pub use drng::ChaCha20Backend;

/// ChaCha20 key size in bytes (256-bit key).
pub(crate) const CHACHA20_KEY_SIZE: usize = 32;

/// ChaCha20 key size in 32-bit words.
pub(crate) const CHACHA20_KEY_WORDS: usize = CHACHA20_KEY_SIZE / 4;

/// ChaCha20 output block size in bytes.
pub(crate) const CHACHA20_BLOCK_SIZE: usize = 64;

/// ChaCha20 output block size in 32-bit words.
pub(crate) const CHACHA20_BLOCK_WORDS: usize = CHACHA20_BLOCK_SIZE / 4;
