use core::{
    fmt,
    iter::FusedIterator,
    mem,
    ptr::{self, NonNull},
    slice,
};

use allocator_api2::alloc::Allocator;

use super::{Devector, GrowthPolicy};

/// Draining iterator returned by [`Devector::drain`].
pub struct Drain<'a, T: 'a, const N: usize, G: GrowthPolicy, A: Allocator> {
    /// Number of kept elements before the drained range
    pub(super) prefix_len: usize,
    /// Index of the first kept element after the drained range
    pub(super) tail_start: usize,
    /// Number of kept elements after the drained range
    pub(super) tail_len: usize,
    /// Current remaining range to remove
    pub(super) iter: slice::Iter<'a, T>,
    pub(super) dev: NonNull<Devector<T, N, G, A>>,
}

impl<T: fmt::Debug, const N: usize, G: GrowthPolicy, A: Allocator> fmt::Debug
    for Drain<'_, T, N, G, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Drain").field(&self.iter.as_slice()).finish()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Drain<'_, T, N, G, A> {
    pub fn as_slice(&self) -> &[T] {
        self.iter.as_slice()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> AsRef<[T]> for Drain<'_, T, N, G, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

unsafe impl<T: Sync, const N: usize, G: GrowthPolicy, A: Allocator + Sync> Sync
    for Drain<'_, T, N, G, A>
{
}

unsafe impl<T: Send, const N: usize, G: GrowthPolicy, A: Allocator + Send> Send
    for Drain<'_, T, N, G, A>
{
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Iterator for Drain<'_, T, N, G, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.iter
            .next()
            .map(|elt| unsafe { ptr::read(elt as *const _) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> DoubleEndedIterator
    for Drain<'_, T, N, G, A>
{
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.iter
            .next_back()
            .map(|elt| unsafe { ptr::read(elt as *const _) })
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Drop for Drain<'_, T, N, G, A> {
    fn drop(&mut self) {
        /// Closes the gap left by the drained range, moving whichever side of
        /// it is shorter.
        struct DropGuard<'r, 'a, T, const N: usize, G: GrowthPolicy, A: Allocator>(
            &'r mut Drain<'a, T, N, G, A>,
        );

        impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Drop for DropGuard<'_, '_, T, N, G, A> {
            fn drop(&mut self) {
                let drain = &mut *self.0;
                unsafe {
                    let dev = drain.dev.as_mut();
                    let front = dev.front;
                    let prefix_len = drain.prefix_len;
                    let drained = drain.tail_start - prefix_len;
                    let buf = dev.storage.as_mut_ptr();
                    if prefix_len < drain.tail_len {
                        ptr::copy(buf.add(front), buf.add(front + drained), prefix_len);
                        dev.front = front + drained;
                        dev.back = front + drain.tail_start + drain.tail_len;
                    } else {
                        ptr::copy(
                            buf.add(front + drain.tail_start),
                            buf.add(front + prefix_len),
                            drain.tail_len,
                        );
                        dev.back = front + prefix_len + drain.tail_len;
                    }
                }
            }
        }

        let iter = mem::take(&mut self.iter);
        let drop_len = iter.len();

        let mut dev = self.dev;

        // ensure elements are moved back into their appropriate places, even when drop_in_place panics
        let _guard = DropGuard(self);

        if drop_len == 0 {
            return;
        }

        let drop_ptr = iter.as_slice().as_ptr();

        unsafe {
            // rebuild the pointer from the devector's buffer for write provenance
            let base = dev.as_mut().storage.as_mut_ptr();
            let to_drop = match mem::size_of::<T>() {
                0 => ptr::slice_from_raw_parts_mut(base, drop_len),
                _ => {
                    let drop_offset = drop_ptr.offset_from_unsigned(base);
                    ptr::slice_from_raw_parts_mut(base.add(drop_offset), drop_len)
                }
            };
            ptr::drop_in_place(to_drop);
        }
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> ExactSizeIterator
    for Drain<'_, T, N, G, A>
{
    #[inline]
    fn len(&self) -> usize {
        self.iter.len()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> FusedIterator for Drain<'_, T, N, G, A> {}
