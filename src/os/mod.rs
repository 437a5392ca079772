//! Operating system abstraction layer
//!
//! This module provides a unified, platform-independent interface to the
//! operating system services the DRNG core depends on.
//!
//! Platform-specific implementations are selected at compile time using
//! conditional compilation. Each submodule exposes the same public surface,
//! allowing higher-level code to remain fully portable.
//!
//! Current capabilities:
//! - best-effort, non-blocking system randomness for state initialization
//! - a coarse time source mixed into freshly allocated generator states
//!
//! The randomness exposed here is deliberately *best effort*: a freshly
//! allocated generator state is untrusted until seeded by the entropy-pool
//! collaborator anyway, so initialization must never block or fail hard just
//! because the platform source is unavailable.

use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(target_os = "macos")]
pub(crate) mod macos;

#[cfg(target_os = "macos")]
pub(crate) use macos::*;

#[cfg(target_os = "linux")]
pub(crate) mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::*;

#[cfg(target_os = "windows")]
pub(crate) mod windows;

#[cfg(target_os = "windows")]
pub(crate) use windows::*;

/// Returns a coarse timestamp for mixing into fresh generator states.
///
/// The value is a nanosecond-resolution reading of the system clock. It is
/// not a randomness source; it only ensures that two states allocated at
/// different times start from different word values even when the platform
/// randomness source is unavailable.
pub(crate) fn coarse_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
