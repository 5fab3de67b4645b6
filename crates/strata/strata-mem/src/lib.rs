use memmap2::MmapMut;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Page-aligned anonymous mapping. Fresh pages are zero-filled by the kernel
/// but not necessarily resident.
pub struct AnonRegion {
    mmap: MmapMut,
    locked: AtomicBool,
}

impl AnonRegion {
    /// Map `size_bytes` of anonymous memory read-write.
    pub fn alloc(size_bytes: usize) -> io::Result<Self> {
        let mmap = MmapMut::map_anon(size_bytes)?;
        Ok(Self {
            mmap,
            locked: AtomicBool::new(false),
        })
    }

    /// Return raw pointer to the start of the region.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    /// Pin the region's pages in physical memory. Best-effort; pages are
    /// unpinned again when the region is dropped.
    #[cfg(unix)]
    pub fn lock(&self) -> bool {
        let rc = unsafe { libc::mlock(self.mmap.as_ptr() as *const libc::c_void, self.mmap.len()) };
        if rc == 0 {
            self.locked.store(true, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Page locking is only wired up for unix targets.
    #[cfg(not(unix))]
    pub fn lock(&self) -> bool {
        false
    }
}

impl Drop for AnonRegion {
    fn drop(&mut self) {
        #[cfg(unix)]
        if self.locked.load(Ordering::Relaxed) {
            unsafe {
                libc::munlock(self.mmap.as_ptr() as *const libc::c_void, self.mmap.len());
            }
        }
    }
}
