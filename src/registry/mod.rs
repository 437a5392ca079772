//! Generator instance management
//!
//! This module scales the DRNG to concurrent demand. It provides:
//!
//! - [`Instance`]
//!   One operational generator: a backend-allocated state, the locks that
//!   serialize access to it, and the seed-status bookkeeping.
//!
//! - [`Registry`]
//!   The owner of all instances: the default instance created eagerly, the
//!   lazily-built per-topology-group table with its race-free one-time
//!   publication protocol, non-blocking lookup, and backend switching.
//!
//! - a process-global facade ([`global`], [`ensure_scaled`],
//!   [`schedule_scaling`]) wiring the registry to the built-in ChaCha20
//!   backend and the detected hardware topology.
//!
//! Scaling exists purely to eliminate lock contention: each topology group
//! gets an independent generator so concurrent consumers on different
//! groups never serialize on one state lock. Correctness never depends on
//! the table being present — every path falls back to the default instance.

pub(crate) mod instance;
pub(crate) mod scaler;

pub use instance::Instance;
pub use scaler::{Registry, RegistryError};

use std::sync::OnceLock;

use crate::backend::chacha20::ChaCha20Backend;
use crate::topology;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry, created on first use over the ChaCha20
/// backend with one instance slot per detected topology group.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(|| {
        // The built-in backend cannot refuse an allocation at its native
        // security strength.
        Registry::new(&ChaCha20Backend, topology::group_count())
            .expect("default DRNG instance allocation failed")
    })
}

/// Idempotently builds the global per-topology-group instance table.
///
/// See [`Registry::ensure_scaled`]. Callers treat an error as "scaling
/// unavailable, continue using the default instance" — never as a reason to
/// stop producing random output.
pub fn ensure_scaled() -> Result<(), RegistryError> {
    global().ensure_scaled()
}

/// Triggers scaling from a background thread.
///
/// The one-shot "scale now" signal: the work is taken off the caller's
/// latency path, and repeated signals are coalesced by the idempotent
/// scaling protocol. A failure is logged and the default instance keeps
/// serving.
pub fn schedule_scaling() {
    std::thread::spawn(|| {
        if let Err(err) = global().ensure_scaled() {
            log::warn!("DRNG scaling unavailable ({err:?}), continuing with default instance");
        }
    });
}
