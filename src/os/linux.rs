//! Operating system abstraction layer (Linux)
//!
//! On Linux, system randomness is obtained with the `getrandom` system call
//! in non-blocking mode. The call draws from the kernel entropy pool and is
//! suitable for mixing into fresh generator states.

use libc::{GRND_NONBLOCK, c_void, getrandom};

/// Fills a buffer with system randomness, best effort.
///
/// Repeatedly calls `getrandom` in non-blocking mode until the buffer is
/// filled. Partial reads are handled transparently. Returns `false` without
/// touching the rest of the buffer if the kernel reports an error (e.g. the
/// entropy pool is not yet initialized early in boot); the caller is
/// expected to proceed with whatever other material it mixes in.
pub(crate) fn sys_random(buf: &mut [u8]) -> bool {
    let mut filled = 0;

    while filled < buf.len() {
        let ret = unsafe {
            getrandom(
                buf[filled..].as_mut_ptr() as *mut c_void,
                buf.len() - filled,
                GRND_NONBLOCK,
            )
        };

        if ret < 0 {
            return false;
        }

        filled += ret as usize;
    }

    true
}
