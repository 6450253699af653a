use core::{convert::Infallible, fmt, marker::PhantomData};

use allocator_api2::alloc::Allocator;

#[cfg(feature = "batch_deque")]
use crate::collections::BatchDeque;
use crate::collections::{
    adapter::ContainerCommon,
    devector::{Devector, GrowthPolicy},
};

pub trait StackLike<T>: ContainerCommon {
    type PushError;

    fn push(&mut self, value: T) -> Result<(), Self::PushError>;

    fn pop(&mut self) -> Option<T>;

    fn top(&self) -> Option<&T>;

    fn top_mut(&mut self) -> Option<&mut T>;
}

/// LIFO adapter over any [`StackLike`] container.
pub struct Stack<T, Container: StackLike<T> = Devector<T>> {
    container: Container,
    _marker: PhantomData<T>,
}

impl<T, Container: StackLike<T>> Stack<T, Container> {
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
        self.container.push(value)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.container.pop()
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.container.top()
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.container.top_mut()
    }

    /// Pops every item, top first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        core::iter::from_fn(move || self.pop())
    }
}

impl<T, Container: StackLike<T>> From<Container> for Stack<T, Container> {
    #[inline]
    fn from(value: Container) -> Self {
        Self::new(value)
    }
}

impl<T, Container: StackLike<T> + Default> Default for Stack<T, Container> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<T, Container: StackLike<T> + fmt::Debug> fmt::Debug for Stack<T, Container> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stack").field(&self.container).finish()
    }
}

impl<T, Container: StackLike<T, PushError = Infallible>> Extend<T> for Stack<T, Container> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            let Ok(()) = self.push(value);
        }
    }
}

impl<T, Container> FromIterator<T> for Stack<T, Container>
where
    Container: StackLike<T, PushError = Infallible> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stack = Self::default();
        stack.extend(iter);
        stack
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> StackLike<T> for Devector<T, N, G, A> {
    type PushError = Infallible;

    #[inline]
    fn push(&mut self, value: T) -> Result<(), Self::PushError> {
        self.push_back(value);
        Ok(())
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        self.pop_back()
    }

    #[inline]
    fn top(&self) -> Option<&T> {
        self.back()
    }

    #[inline]
    fn top_mut(&mut self) -> Option<&mut T> {
        self.back_mut()
    }
}

#[cfg(feature = "batch_deque")]
impl<T, const S: usize, A: Allocator> StackLike<T> for BatchDeque<T, S, A> {
    type PushError = Infallible;

    #[inline]
    fn push(&mut self, value: T) -> Result<(), Self::PushError> {
        self.push_back(value);
        Ok(())
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        self.pop_back()
    }

    #[inline]
    fn top(&self) -> Option<&T> {
        self.back()
    }

    #[inline]
    fn top_mut(&mut self) -> Option<&mut T> {
        self.back_mut()
    }
}
