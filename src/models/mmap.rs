//! Read-only memory map of a whole file.
//!
//! Thin wrapper over `mmap(2)`. The mapping starts at file offset 0, so the
//! base pointer is page aligned and every in-file alignment (8 or 64 bytes)
//! carries over to memory. That is what makes decoded column views usable as
//! typed slices without copying.
//!
//! - Read-only `MAP_PRIVATE` mapping, safe to share across threads.
//! - Exposes bytes via `Deref<[u8]>` and `AsRef<[u8]>`.
//! - `munmap` on drop; the file handle lives as long as the mapping.
//! - Empty files map to an empty slice without calling `mmap`.
//!
//! POSIX only.
//!
//! ```ignore
//! let map = MemMap::open("survey.btbl")?;
//! let table = decode(SharedBytes::from_owner(map))?;
//! ```

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;

#[derive(Debug)]
pub struct MemMap {
    ptr: *mut u8,
    len: usize,
    _file: File,
}

// SAFETY: the mapping is read-only and never handed out mutably.
unsafe impl Send for MemMap {}

// SAFETY: as above, shared access only ever reads.
unsafe impl Sync for MemMap {}

impl MemMap {
    /// Map all of `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = usize::try_from(file.metadata()?.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "file is larger than the address space",
            )
        })?;

        if len == 0 {
            return Ok(Self {
                ptr: ptr::null_mut(),
                len: 0,
                _file: file,
            });
        }

        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        log::debug!("mapped {} bytes of {}", len, path.as_ref().display());
        Ok(Self {
            ptr: ptr as *mut u8,
            len,
            _file: file,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: `ptr` maps `len` readable bytes until drop.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl AsRef<[u8]> for MemMap {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::Deref for MemMap {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Drop for MemMap {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: `ptr`/`len` are exactly what `mmap` returned in `open`.
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
    }
}
