//! Allocator adapter that caps the number of live allocations.

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator, Global};

/// Wraps an allocator and refuses to allocate once `capacity` blocks are live.
///
/// Every tree node (and the tree's sentinel) is one block, so the capacity is
/// a cap on tree size plus one. The counters make it easy to check that a
/// tree returns every node it took.
///
/// The tree owns its allocator, so pass `&BoundedAlloc` to keep access to the
/// counters while the tree is alive.
#[derive(Debug)]
pub struct BoundedAlloc<A = Global> {
    inner: A,
    capacity: usize,
    live: Cell<usize>,
    total: Cell<usize>,
}

impl BoundedAlloc<Global> {
    pub fn new(capacity: usize) -> Self {
        Self::with_allocator(capacity, Global)
    }
}

impl<A> BoundedAlloc<A> {
    pub fn with_allocator(capacity: usize, inner: A) -> Self {
        Self {
            inner,
            capacity,
            live: Cell::new(0),
            total: Cell::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of blocks currently allocated and not yet returned.
    #[inline]
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Number of successful allocations over the allocator's lifetime.
    #[inline]
    pub fn total_allocations(&self) -> usize {
        self.total.get()
    }
}

unsafe impl<A> Allocator for BoundedAlloc<A>
where
    A: Allocator,
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if self.live.get() >= self.capacity {
            return Err(AllocError);
        }

        let ptr = self.inner.allocate(layout)?;
        self.live.set(self.live.get() + 1);
        self.total.set(self.total.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        debug_assert!(self.live.get() > 0, "more blocks returned than were handed out");
        self.live.set(self.live.get().saturating_sub(1));
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}
