use allocator_api2::alloc::Allocator;

#[cfg(feature = "batch_deque")]
use crate::collections::BatchDeque;
use crate::collections::devector::{Devector, GrowthPolicy};

pub trait ContainerCommon {
    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> ContainerCommon for Devector<T, N, G, A> {
    #[inline]
    fn len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    /// A devector grows on demand, so it is full only at `max_size`.
    #[inline]
    fn is_full(&self) -> bool {
        self.len() == self.max_size()
    }
}

#[cfg(feature = "batch_deque")]
impl<T, const S: usize, A: Allocator> ContainerCommon for BatchDeque<T, S, A> {
    #[inline]
    fn len(&self) -> usize {
        self.len()
    }

    /// Segments are allocated on demand, there is no fixed capacity.
    #[inline]
    fn capacity(&self) -> usize {
        self.max_size()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.is_empty()
    }
}
