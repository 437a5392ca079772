//! Scalable deterministic random number generation
//!
//! This crate provides the deterministic-random-bit-generation core of a
//! system random number generator: a stream-cipher DRNG that is periodically
//! reseeded from an external entropy source, exposed through a pluggable
//! backend interface, and scaled to one independent generator instance per
//! hardware topology group to eliminate lock contention under concurrent
//! demand.
//!
//! The focus is on **clarity, predictability, and auditability**. The crate
//! consumes ready-to-use seed bytes and produces pseudorandom output; entropy
//! collection, entropy estimation, and health testing are the responsibility
//! of higher layers.
//!
//! # Module overview
//!
//! - `backend`
//!   The capability interface every DRNG algorithm must satisfy, together
//!   with the built-in ChaCha20 backend. A backend is an immutable record of
//!   operations (allocate, seed, generate, conditioning-hash accessors) that
//!   is shared read-only across all generator instances, so the rest of the
//!   crate stays algorithm-agnostic.
//!
//! - `registry`
//!   Generator instance management: the eagerly-created default instance,
//!   the lazily-built per-topology-group instance table with its race-free
//!   one-time publication protocol, non-blocking instance lookup, and
//!   backend switching.
//!
//! - `topology`
//!   Detection of the number of hardware topology groups (e.g. NUMA nodes)
//!   used to size the instance table.
//!
//! - `os`
//!   Platform abstraction for best-effort system randomness and the coarse
//!   time source mixed into freshly allocated generator states.
//!
//! # Design goals
//!
//! - Exact, auditable cipher-state semantics (seed folding, backtracking
//!   resistance, carry-propagating nonce updates)
//! - Unconditional zeroization of secret state on every deallocation path
//! - Lock-free instance lookup on the generation fast path
//! - Minimal and explicit APIs
//!
//! This crate is not a general-purpose cryptographic library; it is the DRNG
//! core a random-number subsystem is built around.

pub(crate) mod os;

pub mod backend;
pub mod registry;
pub mod topology;

pub use backend::chacha20::ChaCha20Backend;
pub use backend::{BackendError, DrngBackend, DrngState, OutputMode, SECURITY_STRENGTH_BYTES};
pub use registry::{Instance, Registry, RegistryError, ensure_scaled, global, schedule_scaling};
