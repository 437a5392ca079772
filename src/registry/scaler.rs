//! Instance registry and topology scaler
//!
//! The [`Registry`] owns the process's generator instances: the default
//! instance created eagerly at startup, and — once scaling is warranted —
//! one further instance per hardware topology group, published as an
//! immutable table.
//!
//! The table is built lazily and exactly once. Construction is serialized
//! by the configuration mutex (also held for backend switches), and
//! publication goes through a one-shot cell whose release/acquire semantics
//! guarantee that any reader observing the table observes fully-constructed
//! instances. A publication race lost to a concurrent caller is benign: the
//! duplicate table is torn down and the winner's table serves everyone.
//!
//! Lookup is a non-blocking read. It never takes the configuration mutex
//! and falls back to the default instance while the table is unpublished.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use super::instance::Instance;
use crate::backend::{BackendError, DrngBackend, SECURITY_STRENGTH_BYTES};

/// Errors reported by registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A backend operation failed; for `ensure_scaled` this unwinds the
    /// in-progress table and leaves the registry retryable.
    Backend(BackendError),
    /// A backend switch was requested while instances of another non-default
    /// backend are still live; drain those first.
    BackendMismatch,
}

/// Process-wide generator instance registry.
///
/// Lifecycle: created with only the default instance, mutated exclusively
/// through [`Registry::ensure_scaled`] and [`Registry::set_backend`] (both
/// serialized by the configuration mutex), and torn down by dropping the
/// registry, which deallocates and zeroizes every instance it still owns.
pub struct Registry {
    default: Arc<Instance>,
    groups: usize,
    table: OnceLock<Vec<Arc<Instance>>>,
    /// Active backend for new allocations; the name of the backend the
    /// registry was created with doubles as the switch-policy anchor.
    config: Mutex<&'static dyn DrngBackend>,
    default_backend_name: &'static str,
}

fn lock<'a>(
    config: &'a Mutex<&'static dyn DrngBackend>,
) -> MutexGuard<'a, &'static dyn DrngBackend> {
    config.lock().unwrap_or_else(|err| err.into_inner())
}

impl Registry {
    /// Creates a registry with an eagerly-allocated default instance and
    /// room for one instance per topology group.
    pub fn new(backend: &'static dyn DrngBackend, groups: usize) -> Result<Self, BackendError> {
        let default = Arc::new(Instance::new(backend, SECURITY_STRENGTH_BYTES)?);

        Ok(Self {
            default,
            groups: groups.max(1),
            table: OnceLock::new(),
            config: Mutex::new(backend),
            default_backend_name: backend.name(),
        })
    }

    /// The number of topology groups this registry scales to.
    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// The eagerly-created default instance. Group 0 of a scaled table
    /// aliases it.
    pub fn default_instance(&self) -> &Arc<Instance> {
        &self.default
    }

    /// Whether the per-group table has been published.
    pub fn is_scaled(&self) -> bool {
        self.table.get().is_some()
    }

    /// Name of the backend new instances are allocated under, for reporting.
    pub fn active_backend_name(&self) -> &'static str {
        lock(&self.config).name()
    }

    /// Name of the active backend's conditioning hash, for reporting.
    pub fn active_hash_name(&self) -> &'static str {
        lock(&self.config).hash_name()
    }

    /// Idempotently guarantees the per-topology-group instance table exists.
    ///
    /// Safe to invoke redundantly and concurrently: only one caller performs
    /// real work, everyone else observes the published table and returns
    /// immediately. On a per-group allocation failure every instance built
    /// in this pass is deallocated and zeroized, the table stays
    /// unpublished, and a later call may retry.
    pub fn ensure_scaled(&self) -> Result<(), RegistryError> {
        let config = lock(&self.config);

        // Per-group instances are already present.
        if self.table.get().is_some() {
            return Ok(());
        }

        let backend: &'static dyn DrngBackend = *config;
        let mut table = Vec::with_capacity(self.groups);

        // Group 0 aliases the pre-existing default instance.
        table.push(Arc::clone(&self.default));

        for group in 1..self.groups {
            // Dropping the partially-built table on the error path tears
            // down and zeroizes every instance allocated in this pass.
            let instance = Instance::new(backend, SECURITY_STRENGTH_BYTES)
                .map_err(RegistryError::Backend)?;

            // No entropy is copied over from the default instance; the new
            // instance simply reseeds before first trusted use.
            instance.mark_needs_reseed();
            table.push(Arc::new(instance));

            log::info!("DRNG for topology group {group} allocated");
        }

        // One-shot publication; the cell's ordering guarantees readers of
        // the table see fully-initialized instances. Losing the race can
        // only happen if the check above was raced, so discard silently.
        if self.table.set(table).is_err() {
            log::debug!("per-group DRNG table already published by concurrent caller");
        }

        Ok(())
    }

    /// Resolves the instance serving the given topology group.
    ///
    /// A single non-blocking read: while the table is unpublished, and for
    /// out-of-range groups, the default instance serves. Never takes the
    /// configuration mutex.
    pub fn lookup(&self, group: usize) -> &Arc<Instance> {
        match self.table.get() {
            Some(table) => table.get(group).unwrap_or(&self.default),
            None => &self.default,
        }
    }

    /// Installs a new backend for all live instances and future allocations.
    ///
    /// Requires the same mutual-exclusion scope as table publication. Only
    /// transitions involving the registry's original default backend are
    /// allowed; switching between two non-default backends reports
    /// [`RegistryError::BackendMismatch`] and the caller must drain the old
    /// backend's instances first. Each live instance gets a fresh state
    /// allocated under the new backend and seeded from its old state; an
    /// instance whose transfer fails is left on the new backend but marked
    /// for reseed. Every replacement state is allocated before any instance
    /// is touched, so an allocation failure leaves all instances and the
    /// active backend unchanged.
    pub fn set_backend(&self, new: &'static dyn DrngBackend) -> Result<(), RegistryError> {
        let mut config = lock(&self.config);

        if new.name() != self.default_backend_name
            && config.name() != self.default_backend_name
        {
            log::warn!("disallow setting new DRNG backend, drain the old one first");
            return Err(RegistryError::BackendMismatch);
        }

        let instances: &[Arc<Instance>] = match self.table.get() {
            Some(table) => table,
            None => std::slice::from_ref(&self.default),
        };

        // All allocations first; a failure here drops (and zeroizes) the
        // states built so far without switching a single instance.
        let mut fresh = Vec::with_capacity(instances.len());
        for _ in instances {
            let state = new
                .alloc(SECURITY_STRENGTH_BYTES)
                .map_err(RegistryError::Backend)?;

            fresh.push(state);
        }

        // Nothing below can fail; the switch covers the whole table.
        for (group, (instance, state)) in instances.iter().zip(fresh).enumerate() {
            instance.swap_backend(new, state);

            log::info!("DRNG of topology group {group} switched to {}", new.name());
        }

        *config = new;

        Ok(())
    }
}
