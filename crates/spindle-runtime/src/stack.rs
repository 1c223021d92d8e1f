//! Strand stack mappings
//!
//! One anonymous mapping per strand slot, with a PROT_NONE guard page below
//! the usable span so overflow faults instead of silently corrupting the
//! neighbouring allocation. Mappings are created at runtime init, reused for
//! every strand that occupies the slot, and unmapped at teardown.

use spindle_core::error::MemoryError;

/// Owned stack mapping for one strand slot.
///
/// Layout, low to high addresses:
///
/// ```text
/// [ guard page (PROT_NONE) ][ usable stack, grows downward from top() ]
/// ```
pub struct StrandStack {
    map_base: *mut u8,
    map_len: usize,
    base: *mut u8,
    size: usize,
}

// Safety: the mapping is owned; aliasing is governed by the slot ownership
// protocol in `context`.
unsafe impl Send for StrandStack {}
unsafe impl Sync for StrandStack {}

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

impl StrandStack {
    /// Map a stack whose usable span is at least `size` bytes.
    ///
    /// `size` is remembered exactly as requested; `top()` is `base() + size`
    /// regardless of page rounding, so the creation-time layout math is
    /// independent of the page size.
    pub fn map(size: usize) -> Result<Self, MemoryError> {
        let page = page_size();
        let usable = size.div_ceil(page) * page;
        let map_len = usable + page;

        let map_base = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                map_len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if map_base == libc::MAP_FAILED {
            return Err(MemoryError::MapFailed);
        }
        let map_base = map_base as *mut u8;

        // Open the span above the guard page.
        let rc = unsafe {
            libc::mprotect(
                map_base.add(page) as *mut libc::c_void,
                usable,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if rc != 0 {
            unsafe {
                libc::munmap(map_base as *mut libc::c_void, map_len);
            }
            return Err(MemoryError::ProtectFailed);
        }

        Ok(Self {
            map_base,
            map_len,
            base: unsafe { map_base.add(page) },
            size,
        })
    }

    /// Lowest usable address.
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// One past the highest usable address; the stack grows down from here.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.add(self.size) }
    }

    /// Requested usable size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for StrandStack {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.map_base as *mut libc::c_void, self.map_len);
        }
    }
}
