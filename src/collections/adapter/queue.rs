use core::{convert::Infallible, fmt, marker::PhantomData};

use allocator_api2::alloc::Allocator;

#[cfg(feature = "batch_deque")]
use crate::collections::BatchDeque;
use crate::collections::{
    adapter::ContainerCommon,
    devector::{Devector, GrowthPolicy},
};

pub trait QueueLike<T>: ContainerCommon {
    type PushError;

    fn push_back(&mut self, value: T) -> Result<(), Self::PushError>;

    fn pop_front(&mut self) -> Option<T>;

    fn front(&self) -> Option<&T>;

    fn front_mut(&mut self) -> Option<&mut T>;

    fn back(&self) -> Option<&T>;

    fn back_mut(&mut self) -> Option<&mut T>;
}

/// FIFO adapter over any [`QueueLike`] container: items leave in the order
/// they were pushed.
pub struct Queue<T, Container: QueueLike<T> = Devector<T>> {
    container: Container,
    _marker: PhantomData<T>,
}

impl<T, Container: QueueLike<T>> Queue<T, Container> {
    #[inline]
    pub fn new(container: Container) -> Self {
        Self {
            container,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn inner(&self) -> &Container {
        &self.container
    }

    #[inline]
    pub fn into_inner(self) -> Container {
        self.container
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.container.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), Container::PushError> {
        self.container.push_back(value)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.container.pop_front()
    }

    /// The oldest item, next to be popped.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.container.front()
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.container.front_mut()
    }

    /// The most recently pushed item.
    #[inline]
    pub fn newest(&self) -> Option<&T> {
        self.container.back()
    }

    /// Pops every item, oldest first. Items the iterator is not asked for
    /// stay queued.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        core::iter::from_fn(move || self.pop())
    }
}

impl<T, Container: QueueLike<T>> From<Container> for Queue<T, Container> {
    #[inline]
    fn from(value: Container) -> Self {
        Self::new(value)
    }
}

impl<T, Container: QueueLike<T> + Default> Default for Queue<T, Container> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<T, Container: QueueLike<T> + fmt::Debug> fmt::Debug for Queue<T, Container> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Queue").field(&self.container).finish()
    }
}

impl<T, Container: QueueLike<T, PushError = Infallible>> Extend<T> for Queue<T, Container> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            let Ok(()) = self.push(value);
        }
    }
}

impl<T, Container> FromIterator<T> for Queue<T, Container>
where
    Container: QueueLike<T, PushError = Infallible> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::default();
        queue.extend(iter);
        queue
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> QueueLike<T> for Devector<T, N, G, A> {
    type PushError = Infallible;

    #[inline]
    fn push_back(&mut self, value: T) -> Result<(), Self::PushError> {
        self.push_back(value);
        Ok(())
    }

    #[inline]
    fn pop_front(&mut self) -> Option<T> {
        self.pop_front()
    }

    #[inline]
    fn front(&self) -> Option<&T> {
        self.front()
    }

    #[inline]
    fn front_mut(&mut self) -> Option<&mut T> {
        self.front_mut()
    }

    #[inline]
    fn back(&self) -> Option<&T> {
        self.back()
    }

    #[inline]
    fn back_mut(&mut self) -> Option<&mut T> {
        self.back_mut()
    }
}

#[cfg(feature = "batch_deque")]
impl<T, const S: usize, A: Allocator> QueueLike<T> for BatchDeque<T, S, A> {
    type PushError = Infallible;

    #[inline]
    fn push_back(&mut self, value: T) -> Result<(), Self::PushError> {
        self.push_back(value);
        Ok(())
    }

    #[inline]
    fn pop_front(&mut self) -> Option<T> {
        self.pop_front()
    }

    #[inline]
    fn front(&self) -> Option<&T> {
        self.front()
    }

    #[inline]
    fn front_mut(&mut self) -> Option<&mut T> {
        self.front_mut()
    }

    #[inline]
    fn back(&self) -> Option<&T> {
        self.back()
    }

    #[inline]
    fn back_mut(&mut self) -> Option<&mut T> {
        self.back_mut()
    }
}
