//! Operating system abstraction layer (Windows)

use windows_sys::Win32::Security::Cryptography::{
    BCRYPT_USE_SYSTEM_PREFERRED_RNG, BCryptGenRandom,
};

/// Fills a buffer with system randomness, best effort.
///
/// Returns `false` if `BCryptGenRandom` reports a non-zero status.
pub(crate) fn sys_random(buf: &mut [u8]) -> bool {
    let status = unsafe {
        BCryptGenRandom(
            std::ptr::null_mut(),
            buf.as_mut_ptr(),
            buf.len() as u32,
            BCRYPT_USE_SYSTEM_PREFERRED_RNG,
        )
    };

    status == 0
}
