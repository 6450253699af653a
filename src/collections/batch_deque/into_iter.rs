use core::{fmt, iter::FusedIterator};

use allocator_api2::alloc::Allocator;

use super::BatchDeque;

/// Owning iterator over the elements of a [`BatchDeque`]. Segments are
/// released as soon as they are drained.
pub struct IntoIter<T, const S: usize, A: Allocator> {
    inner: BatchDeque<T, S, A>,
}

impl<T, const S: usize, A: Allocator> IntoIter<T, S, A> {
    pub(super) fn new(inner: BatchDeque<T, S, A>) -> Self {
        IntoIter { inner }
    }
}

impl<T: Clone, const S: usize, A: Allocator + Clone> Clone for IntoIter<T, S, A> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<T: fmt::Debug, const S: usize, A: Allocator> fmt::Debug for IntoIter<T, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.inner).finish()
    }
}

impl<T, const S: usize, A: Allocator> Iterator for IntoIter<T, S, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.inner.len();
        (len, Some(len))
    }

    #[inline]
    fn count(self) -> usize {
        self.inner.len()
    }

    #[inline]
    fn last(mut self) -> Option<Self::Item> {
        self.inner.pop_back()
    }
}

impl<T, const S: usize, A: Allocator> DoubleEndedIterator for IntoIter<T, S, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.inner.pop_back()
    }
}

impl<T, const S: usize, A: Allocator> ExactSizeIterator for IntoIter<T, S, A> {
    #[inline]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T, const S: usize, A: Allocator> FusedIterator for IntoIter<T, S, A> {}
