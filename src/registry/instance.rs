//! One operational DRNG instance
//!
//! An [`Instance`] ties a generator state to the backend it was allocated
//! under and serializes access to it. Two synchronization domains exist:
//!
//! - the blocking lock around the state and backend reference, held across
//!   seed, generate, and backend-swap sequences that may need to wait;
//! - lock-free atomics for the short fast-path reads (seed status, reseed
//!   bookkeeping) that must be usable from contexts where blocking is
//!   forbidden.
//!
//! Whether an unseeded instance may serve output is caller policy; the
//! instance only tracks and reports its status.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use zeroize::Zeroizing;

use crate::backend::{BackendError, DrngBackend, DrngState, OutputMode, SECURITY_STRENGTH_BYTES};

/// Number of generate requests an instance may serve before it reports
/// itself due for a reseed. A much safer margin than the SP800-90A maximum
/// of 2^48 requests between reseeds.
pub(crate) const RESEED_THRESHOLD: i64 = 1 << 20;

/// State guarded by the blocking lock: the generator itself and the backend
/// it was allocated under. The two are swapped together.
struct Core {
    backend: &'static dyn DrngBackend,
    state: Box<dyn DrngState>,
}

/// One operational DRNG.
///
/// Exactly one instance is the process default, created eagerly; all others
/// are created lazily by the registry, one per topology group. Instances
/// are shared behind `Arc` and internally synchronized.
pub struct Instance {
    core: Mutex<Core>,
    fully_seeded: AtomicBool,
    force_reseed: AtomicBool,
    requests: AtomicI64,
}

/// A poisoned lock still guards a coherent generator state; recover the
/// guard rather than propagating the panic of an unrelated thread.
fn lock(core: &Mutex<Core>) -> MutexGuard<'_, Core> {
    core.lock().unwrap_or_else(|err| err.into_inner())
}

impl Instance {
    /// Allocates a new instance under the given backend.
    pub(crate) fn new(
        backend: &'static dyn DrngBackend,
        security_strength: u32,
    ) -> Result<Self, BackendError> {
        let state = backend.alloc(security_strength)?;

        Ok(Self {
            core: Mutex::new(Core { backend, state }),
            fully_seeded: AtomicBool::new(false),
            force_reseed: AtomicBool::new(false),
            requests: AtomicI64::new(RESEED_THRESHOLD),
        })
    }

    /// Injects seed material into the generator state.
    ///
    /// Never fails; zero-length input is a no-op at the cipher level. An
    /// input of at least the security strength marks the instance fully
    /// seeded and refills its request budget.
    pub fn seed(&self, input: &[u8]) {
        let mut core = lock(&self.core);
        core.state.seed(input);
        drop(core);

        if input.len() >= SECURITY_STRENGTH_BYTES as usize {
            self.fully_seeded.store(true, Ordering::Relaxed);
        }
        self.force_reseed.store(false, Ordering::Relaxed);
        self.requests.store(RESEED_THRESHOLD, Ordering::Relaxed);

        log::debug!("DRNG instance seeded with {} bytes", input.len());
    }

    /// Fills `out` with pseudorandom bytes, always the full length.
    pub fn generate(&self, out: &mut [u8], mode: OutputMode) -> Result<u32, BackendError> {
        let mut core = lock(&self.core);
        let written = core.state.generate(out, mode)?;
        drop(core);

        self.requests.fetch_sub(1, Ordering::Relaxed);

        Ok(written)
    }

    /// Fast-path check: has this instance received a full seed since it was
    /// allocated or last marked for reseed? Never blocks.
    pub fn is_seeded(&self) -> bool {
        self.fully_seeded.load(Ordering::Relaxed)
    }

    /// Fast-path check: is a reseed due, either forced or because the
    /// request budget is exhausted? Never blocks.
    pub fn needs_reseed(&self) -> bool {
        self.force_reseed.load(Ordering::Relaxed) || self.requests.load(Ordering::Relaxed) <= 0
    }

    /// Marks the instance as requiring a reseed before its next trusted
    /// use, clearing the fully-seeded status.
    pub fn mark_needs_reseed(&self) {
        self.requests.store(RESEED_THRESHOLD, Ordering::Relaxed);
        self.fully_seeded.store(false, Ordering::Relaxed);
        self.force_reseed.store(true, Ordering::Relaxed);

        log::debug!("DRNG instance marked for reseed");
    }

    /// Name of the backend this instance currently runs on, for reporting.
    pub fn backend_name(&self) -> &'static str {
        lock(&self.core).backend.name()
    }

    /// Name of the conditioning hash of the current backend, for reporting.
    pub fn hash_name(&self) -> &'static str {
        lock(&self.core).backend.hash_name()
    }

    /// Replaces the generator state with `new_state`, which the caller has
    /// already allocated under `new`.
    ///
    /// Taking the replacement state ready-made keeps this step infallible,
    /// so a switch spanning several instances can allocate everything up
    /// front and never stop halfway through the table. The new state is
    /// seeded from the output of the old one, so it starts with the same
    /// entropy; the reseed bookkeeping is left unchanged and the instance
    /// reseeds on its regular schedule. If the entropy transfer fails the
    /// instance is marked for reseed instead. The old state is zeroized on
    /// release.
    pub(crate) fn swap_backend(
        &self,
        new: &'static dyn DrngBackend,
        mut new_state: Box<dyn DrngState>,
    ) {
        let mut seedbuf = Zeroizing::new([0u8; SECURITY_STRENGTH_BYTES as usize]);
        let mut transferred = false;

        let mut core = lock(&self.core);

        match core.state.generate(&mut seedbuf[..], OutputMode::Standard) {
            Ok(_) => {
                new_state.seed(&seedbuf[..]);
                transferred = true;
            }
            Err(err) => {
                log::warn!("entropy transfer to new DRNG backend failed: {err:?}");
            }
        }

        let old_state = std::mem::replace(&mut core.state, new_state);
        let old_backend = std::mem::replace(&mut core.backend, new);
        drop(core);

        old_backend.dealloc(old_state);

        if !transferred {
            self.mark_needs_reseed();
        }
    }
}
