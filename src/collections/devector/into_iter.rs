use core::{fmt, iter::FusedIterator};

use allocator_api2::alloc::Allocator;

use super::{Devector, GrowthPolicy};

/// Owning iterator over the elements of a [`Devector`].
pub struct IntoIter<T, const N: usize, G: GrowthPolicy, A: Allocator> {
    inner: Devector<T, N, G, A>,
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> IntoIter<T, N, G, A> {
    pub(super) fn new(inner: Devector<T, N, G, A>) -> Self {
        IntoIter { inner }
    }

    /// Remaining elements.
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }
}

impl<T: Clone, const N: usize, G: GrowthPolicy, A: Allocator + Clone> Clone
    for IntoIter<T, N, G, A>
{
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<T: fmt::Debug, const N: usize, G: GrowthPolicy, A: Allocator> fmt::Debug
    for IntoIter<T, N, G, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.inner).finish()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Iterator for IntoIter<T, N, G, A> {
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

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> DoubleEndedIterator
    for IntoIter<T, N, G, A>
{
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.inner.pop_back()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> FusedIterator for IntoIter<T, N, G, A> {}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> ExactSizeIterator
    for IntoIter<T, N, G, A>
{
    #[inline]
    fn len(&self) -> usize {
        self.inner.len()
    }
}
