use core::{mem::MaybeUninit, ptr::NonNull};

/// Backing buffer of a [`Devector`](super::Devector).
///
/// `Inline` is used exactly while the capacity is `N`; a `Heap` buffer is
/// always larger than `N`.
pub(crate) enum Storage<T, const N: usize> {
    Inline([MaybeUninit<T>; N]),
    Heap { ptr: NonNull<T>, capacity: usize },
}

impl<T, const N: usize> Storage<T, N> {
    #[inline]
    pub(crate) const fn inline() -> Self {
        Self::Inline([const { MaybeUninit::uninit() }; N])
    }

    #[inline]
    pub(crate) const fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        match self {
            Self::Inline(_) => N,
            Self::Heap { capacity, .. } => *capacity,
        }
    }

    /// Start of the buffer.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const T {
        match self {
            Self::Inline(buf) => buf.as_ptr().cast(),
            Self::Heap { ptr, .. } => ptr.as_ptr(),
        }
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut T {
        match self {
            Self::Inline(buf) => buf.as_mut_ptr().cast(),
            Self::Heap { ptr, .. } => ptr.as_ptr(),
        }
    }
}
