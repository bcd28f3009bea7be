//! Platform memory façade
//!
//! The protocol engine allocates through `calloc(count, size)` and
//! `free(ptr)`. Both forward to one process-wide [`PlatformMemory`], which
//! defaults to [`SystemMemory`] unless another façade is installed first.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use meshrun_core::{MeshError, MeshResult};

/// Allocator interface consumed by the protocol engine
pub trait PlatformMemory: Send + Sync {
    /// Zeroed allocation of `count * size` bytes; null on failure
    fn calloc(&self, count: usize, size: usize) -> *mut u8;

    /// Free a pointer returned by [`calloc`](Self::calloc). Null is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `calloc` on this same façade, and must
    /// not be freed twice.
    unsafe fn free(&self, ptr: *mut u8);
}

/// Header in front of every block, holding the total block size
const HEADER_SIZE: usize = 16;
const BLOCK_ALIGN: usize = 16;

/// `std::alloc` backed façade with a size header per block
#[derive(Debug, Default)]
pub struct SystemMemory {
    live: AtomicUsize,
}

impl SystemMemory {
    pub const fn new() -> Self {
        SystemMemory {
            live: AtomicUsize::new(0),
        }
    }

    /// Blocks allocated and not yet freed
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    fn block_layout(payload: usize) -> Option<Layout> {
        let total = payload.checked_add(HEADER_SIZE)?;
        Layout::from_size_align(total, BLOCK_ALIGN).ok()
    }
}

impl PlatformMemory for SystemMemory {
    fn calloc(&self, count: usize, size: usize) -> *mut u8 {
        let Some(payload) = count.checked_mul(size) else {
            return ptr::null_mut();
        };
        if payload == 0 {
            return ptr::null_mut();
        }
        let Some(layout) = Self::block_layout(payload) else {
            return ptr::null_mut();
        };

        // SAFETY: layout has a non-zero size.
        let base = unsafe { alloc_zeroed(layout) };
        if base.is_null() {
            return ptr::null_mut();
        }

        // SAFETY: the block is at least HEADER_SIZE bytes and 16-aligned.
        unsafe {
            base.cast::<usize>().write(layout.size());
            self.live.fetch_add(1, Ordering::Relaxed);
            base.add(HEADER_SIZE)
        }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let base = ptr.sub(HEADER_SIZE);
        let total = base.cast::<usize>().read();
        // SAFETY: `total` and BLOCK_ALIGN are exactly what calloc used.
        dealloc(base, Layout::from_size_align_unchecked(total, BLOCK_ALIGN));
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

static FACADE: OnceLock<Box<dyn PlatformMemory>> = OnceLock::new();

/// Install the process-wide façade. Must happen before the first
/// allocation; afterwards the façade is fixed.
pub fn install(memory: Box<dyn PlatformMemory>) -> MeshResult<()> {
    FACADE
        .set(memory)
        .map_err(|_| MeshError::AlreadyInitialized)
}

/// The process-wide façade
pub fn facade() -> &'static dyn PlatformMemory {
    FACADE
        .get_or_init(|| Box::new(SystemMemory::new()))
        .as_ref()
}

/// Engine allocation shim
#[inline]
pub fn calloc(count: usize, size: usize) -> *mut u8 {
    facade().calloc(count, size)
}

/// Engine free shim
///
/// # Safety
///
/// Same contract as [`PlatformMemory::free`] on the process-wide façade.
#[inline]
pub unsafe fn free(ptr: *mut u8) {
    facade().free(ptr)
}
