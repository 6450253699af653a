//! Scope guards that undo partially finished element construction when a
//! user callback (`Clone`, `Default`, an iterator) panics.

use core::{
    mem,
    ptr::{self, NonNull},
};

use allocator_api2::alloc::Allocator;

use super::raw;

/// Destroys `len` values starting at `start` unless released.
///
/// For types without drop glue the guard compiles down to nothing.
pub(crate) struct ArrayDestroyGuard<T> {
    start: *mut T,
    len: usize,
}

impl<T> ArrayDestroyGuard<T> {
    /// # Safety
    ///
    /// The `len` values at `start` must be initialized, and so must every value
    /// later added with [`increment_size`](Self::increment_size), for as long
    /// as the guard is armed.
    #[inline]
    pub(crate) unsafe fn new(start: *mut T, len: usize) -> Self {
        Self { start, len }
    }

    #[inline]
    pub(crate) fn increment_size(&mut self, count: usize) {
        self.len += count;
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn release(&mut self) {
        self.len = 0;
    }
}

impl<T> Drop for ArrayDestroyGuard<T> {
    fn drop(&mut self) {
        if mem::needs_drop::<T>() && self.len > 0 {
            unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.start, self.len)) };
        }
    }
}

/// Returns a buffer to its allocator unless released.
pub(crate) struct AllocationGuard<'a, T, A: Allocator> {
    ptr: NonNull<T>,
    capacity: usize,
    alloc: &'a A,
    armed: bool,
}

impl<'a, T, A: Allocator> AllocationGuard<'a, T, A> {
    /// # Safety
    ///
    /// `ptr` must come from [`raw::allocate_array`] with `alloc` and `capacity`.
    #[inline]
    pub(crate) unsafe fn new(ptr: NonNull<T>, capacity: usize, alloc: &'a A) -> Self {
        Self {
            ptr,
            capacity,
            alloc,
            armed: true,
        }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Hands ownership of the buffer back to the caller.
    #[inline]
    pub(crate) fn release(mut self) -> NonNull<T> {
        self.armed = false;
        self.ptr
    }
}

impl<T, A: Allocator> Drop for AllocationGuard<'_, T, A> {
    fn drop(&mut self) {
        if self.armed {
            unsafe { raw::deallocate_array(self.alloc, self.ptr, self.capacity) };
        }
    }
}

/// Which of the two ranges a [`NandGuard`] destroys when dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NandState {
    DestroyDestination,
    DestroySource,
}

/// Guards a source range and a destination range of which exactly one is
/// destroyed on drop.
///
/// While armed it behaves like an [`ArrayDestroyGuard`] over the destination.
/// [`release`](Self::release) flips it over to the source, once.
pub(crate) struct NandGuard<T> {
    source: ArrayDestroyGuard<T>,
    destination: ArrayDestroyGuard<T>,
    state: NandState,
}

impl<T> NandGuard<T> {
    /// # Safety
    ///
    /// Same contract as [`ArrayDestroyGuard::new`] for both ranges.
    #[inline]
    pub(crate) unsafe fn new(
        source: *mut T,
        source_len: usize,
        destination: *mut T,
        destination_len: usize,
    ) -> Self {
        unsafe {
            Self {
                source: ArrayDestroyGuard::new(source, source_len),
                destination: ArrayDestroyGuard::new(destination, destination_len),
                state: NandState::DestroyDestination,
            }
        }
    }

    #[inline]
    pub(crate) fn destination_mut(&mut self) -> &mut ArrayDestroyGuard<T> {
        &mut self.destination
    }

    #[inline]
    pub(crate) fn release(&mut self) {
        debug_assert_eq!(self.state, NandState::DestroyDestination);
        self.state = NandState::DestroySource;
    }
}

impl<T> Drop for NandGuard<T> {
    fn drop(&mut self) {
        match self.state {
            NandState::DestroyDestination => self.source.release(),
            NandState::DestroySource => self.destination.release(),
        }
    }
}
