//! DRNG backend capability interface
//!
//! This module defines the contract a DRNG algorithm must satisfy so that
//! the rest of the crate stays algorithm-agnostic. A backend is an immutable
//! capability record: it knows how to allocate and deallocate generator
//! state, how to inject seed material, how to produce output, and which
//! conditioning hash it is associated with.
//!
//! The split mirrors the two lifetimes involved:
//!
//! - [`DrngBackend`]
//!   The algorithm itself. Backends carry no mutable state, are shared by
//!   `&'static` reference across every generator instance, and outlive all
//!   of them. Installing a different backend is a configuration change made
//!   through the registry, never a per-call parameter.
//!
//! - [`DrngState`]
//!   One allocated generator. States are owned by exactly one instance,
//!   mutated only under that instance's lock, and **must** zeroize all
//!   secret material when deallocated, on success and failure paths alike.
//!   The [`Zeroize`] supertrait makes that obligation part of the contract.
//!
//! The built-in implementation is the ChaCha20 backend in [`chacha20`].

use zeroize::Zeroize;

pub mod chacha20;

/// Native security strength of the subsystem in bytes.
///
/// Every backend must be able to provide at least this strength; requests
/// for more are rejected at allocation time.
pub const SECURITY_STRENGTH_BYTES: u32 = 32;

/// Output mode of a generate request.
///
/// Two generations of the cipher core exist side by side: the standard
/// stream output, and a full-strength variant that folds each permutation
/// block in half via XOR before emitting it. Folding halves the throughput
/// but ensures an entropy density of 1 bit per output bit even under
/// partial-seeding assumptions. Both are modes of the same state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Raw permutation-block output.
    Standard,
    /// Each permutation block is folded in half before emission.
    FullEntropy,
}

/// Errors reported by backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// The requested security strength exceeds the backend's key width.
    /// Fatal to the allocation; no state is created.
    InvalidSecurityStrength { requested: u32, native: u32 },
    /// Memory or resource exhaustion while allocating generator state.
    AllocationFailure,
    /// The backend is unavailable or misconfigured for this operation.
    Unavailable,
    /// A single generate request longer than `u32::MAX` bytes; such a
    /// request could wrap the cipher's 32-bit per-block counter before the
    /// trailing state update re-anchors it.
    RequestTooLarge,
}

/// One allocated generator state.
///
/// All methods mutate the state in place; callers serialize access through
/// their instance lock. Dropping a state zeroizes it.
pub trait DrngState: Send + Zeroize + core::fmt::Debug {
    /// Injects caller-supplied entropy of arbitrary length into the state.
    ///
    /// Seeding never fails; zero-length input is a no-op. There is no
    /// minimum length requirement — deciding whether the instance is
    /// trustworthy afterwards is caller policy, not enforced here.
    fn seed(&mut self, input: &[u8]);

    /// Fills `out` with pseudorandom bytes and returns the exact number of
    /// bytes written, which always equals `out.len()` on success — never a
    /// short count.
    ///
    /// Requests longer than `u32::MAX` bytes are rejected with
    /// [`BackendError::RequestTooLarge`], so every accepted length is
    /// representable in 32 bits — bounding a single request below the
    /// cipher's per-block counter overflow threshold. A state-advancing
    /// update is performed after the output is produced, including for
    /// zero-length requests.
    fn generate(&mut self, out: &mut [u8], mode: OutputMode) -> Result<u32, BackendError>;
}

/// An immutable DRNG algorithm capability record.
///
/// Multiple backends may be linked into a process; an instance references
/// exactly one at a time.
pub trait DrngBackend: Send + Sync {
    /// Human-readable name of the DRNG algorithm, for reporting.
    fn name(&self) -> &'static str;

    /// Name of the associated conditioning hash, for reporting.
    fn hash_name(&self) -> &'static str;

    /// Digest size in bytes of the associated conditioning hash.
    fn hash_digest_size(&self) -> u32;

    /// Computes the conditioning hash of `input` into `digest`.
    ///
    /// `digest` must be at least [`Self::hash_digest_size`] bytes long.
    fn hash_buffer(&self, input: &[u8], digest: &mut [u8]);

    /// Allocates a freshly initialized generator state.
    ///
    /// Rejects a `security_strength` (in bytes) greater than the native key
    /// width with [`BackendError::InvalidSecurityStrength`]. A request for
    /// less than the native strength succeeds with a logged advisory; the
    /// extra margin is simply unused.
    fn alloc(&self, security_strength: u32) -> Result<Box<dyn DrngState>, BackendError>;

    /// Releases a generator state.
    ///
    /// The state is zeroized before its memory is returned; the default
    /// implementation relies on the state's zeroize-on-drop guarantee.
    fn dealloc(&self, state: Box<dyn DrngState>) {
        drop(state);
    }
}
