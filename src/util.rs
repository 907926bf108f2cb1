//! Internal utilities.

use std::ffi::CString;
use std::io;

/// Restores the previous process file-creation mask when dropped.
pub struct UmaskGuard {
    previous: libc::mode_t,
}

impl UmaskGuard {
    /// Installs `mask` as the process umask until the guard is dropped.
    #[must_use]
    pub fn set(mask: libc::mode_t) -> Self {
        // SAFETY: `umask` only swaps the process file-creation mask and
        // cannot fail.
        let previous = unsafe { libc::umask(mask) };
        Self { previous }
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        // SAFETY: see `UmaskGuard::set`.
        unsafe {
            libc::umask(self.previous);
        }
    }
}

/// Resolves an interface name to its kernel index.
///
/// # Errors
///
/// Returns `InvalidInput` if `name` contains a NUL byte, or the OS error
/// reported by `if_nametoindex` (usually `ENODEV`).
pub fn if_nametoindex(name: &str) -> io::Result<u32> {
    let c_name =
        CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index)
}
