//! Array allocation helpers shared by both containers.

use core::{alloc::Layout, mem, ptr::NonNull};

use allocator_api2::alloc::Allocator;

use crate::error::CapacityError;

/// Largest element count a single buffer of `T` may hold.
#[inline]
pub(crate) const fn max_size<T>() -> usize {
    match mem::size_of::<T>() {
        0 => usize::MAX,
        size => isize::MAX as usize / size,
    }
}

#[inline]
pub(crate) fn array_layout<T>(capacity: usize) -> Result<Layout, CapacityError> {
    Layout::array::<T>(capacity).map_err(|_| CapacityError::CapacityOverflow {
        requested: capacity,
        max_size: max_size::<T>(),
    })
}

/// Allocates room for `capacity` values of `T`.
///
/// Zero-sized requests never reach the allocator and yield a dangling pointer.
pub(crate) fn allocate_array<T, A: Allocator>(
    alloc: &A,
    capacity: usize,
) -> Result<NonNull<T>, CapacityError> {
    let layout = array_layout::<T>(capacity)?;
    if layout.size() == 0 {
        return Ok(NonNull::dangling());
    }
    alloc
        .allocate(layout)
        .map(|ptr| ptr.cast())
        .map_err(|_| CapacityError::AllocError { layout })
}

/// # Safety
///
/// `ptr` must come from [`allocate_array`] on the same allocator with the same
/// `capacity`, and must not be used afterwards.
pub(crate) unsafe fn deallocate_array<T, A: Allocator>(alloc: &A, ptr: NonNull<T>, capacity: usize) {
    // a layout that was valid at allocation time is still valid
    let Ok(layout) = Layout::array::<T>(capacity) else {
        return;
    };
    if layout.size() != 0 {
        unsafe { alloc.deallocate(ptr.cast(), layout) };
    }
}
