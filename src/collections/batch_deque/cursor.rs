use core::{
    cmp, fmt, hash,
    ops::{Add, AddAssign, Sub, SubAssign},
};

use allocator_api2::alloc::{Allocator, Global};

use super::BatchDeque;

/// Segment and slot index pair. The segment may lie outside the map, and
/// `index` is always in `0..S`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(super) struct RawCursor<const S: usize> {
    pub(super) segment: isize,
    pub(super) index: usize,
}

impl<const S: usize> RawCursor<S> {
    #[inline]
    pub(super) const fn from_position(pos: isize) -> Self {
        Self {
            segment: pos.div_euclid(S as isize),
            index: pos.rem_euclid(S as isize) as usize,
        }
    }

    #[inline]
    pub(super) const fn position(self) -> isize {
        self.segment * S as isize + self.index as isize
    }

    #[inline]
    pub(super) const fn offset(self, n: isize) -> Self {
        let total = self.index as isize + n;
        Self {
            segment: self.segment + total.div_euclid(S as isize),
            index: total.rem_euclid(S as isize) as usize,
        }
    }

    /// Signed number of steps from `self` to `other`.
    #[inline]
    pub(super) const fn distance_to(self, other: Self) -> isize {
        (other.segment - self.segment) * S as isize + other.index as isize - self.index as isize
    }

    #[inline]
    pub(super) fn increment(&mut self) {
        self.index += 1;
        if self.index == S {
            self.index = 0;
            self.segment += 1;
        }
    }

    #[inline]
    pub(super) fn decrement(&mut self) {
        if self.index == 0 {
            self.index = S;
            self.segment -= 1;
        }
        self.index -= 1;
    }
}

/// Random-access position in a [`BatchDeque`].
///
/// A cursor may point anywhere, including before the first or past the last
/// element. [`get`](Self::get) only yields the elements in between.
pub struct Cursor<'a, T, const S: usize, A: Allocator = Global> {
    deque: &'a BatchDeque<T, S, A>,
    raw: RawCursor<S>,
}

impl<'a, T, const S: usize, A: Allocator> Cursor<'a, T, S, A> {
    #[inline]
    pub(super) fn new(deque: &'a BatchDeque<T, S, A>, pos: isize) -> Self {
        Self {
            deque,
            raw: RawCursor::from_position(pos),
        }
    }

    /// Index of the pointed element relative to the front of the deque.
    #[inline]
    pub fn position(&self) -> isize {
        self.raw.position() - self.deque.begin as isize
    }

    /// Segment and offset inside the segment.
    #[inline]
    pub fn segment_and_index(&self) -> (isize, usize) {
        (self.raw.segment, self.raw.index)
    }

    #[inline]
    pub fn offset(self, n: isize) -> Self {
        Self {
            deque: self.deque,
            raw: self.raw.offset(n),
        }
    }

    #[inline]
    pub fn distance_to(&self, other: &Self) -> isize {
        self.raw.distance_to(other.raw)
    }

    pub fn get(&self) -> Option<&'a T> {
        let pos = self.raw.position();
        let deque = self.deque;
        if pos >= deque.begin as isize && pos < deque.end as isize {
            Some(unsafe { &*deque.slot(pos as usize) })
        } else {
            None
        }
    }
}

impl<T, const S: usize, A: Allocator> Clone for Cursor<'_, T, S, A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const S: usize, A: Allocator> Copy for Cursor<'_, T, S, A> {}

impl<T, const S: usize, A: Allocator> fmt::Debug for Cursor<'_, T, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("segment", &self.raw.segment)
            .field("index", &self.raw.index)
            .finish()
    }
}

impl<T, const S: usize, A: Allocator> PartialEq for Cursor<'_, T, S, A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T, const S: usize, A: Allocator> Eq for Cursor<'_, T, S, A> {}

impl<T, const S: usize, A: Allocator> PartialOrd for Cursor<'_, T, S, A> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, const S: usize, A: Allocator> Ord for Cursor<'_, T, S, A> {
    #[inline]
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T, const S: usize, A: Allocator> hash::Hash for Cursor<'_, T, S, A> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T, const S: usize, A: Allocator> Add<isize> for Cursor<'_, T, S, A> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: isize) -> Self {
        self.offset(rhs)
    }
}

impl<T, const S: usize, A: Allocator> Sub<isize> for Cursor<'_, T, S, A> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: isize) -> Self {
        self.offset(-rhs)
    }
}

impl<T, const S: usize, A: Allocator> AddAssign<isize> for Cursor<'_, T, S, A> {
    #[inline]
    fn add_assign(&mut self, rhs: isize) {
        self.raw = self.raw.offset(rhs);
    }
}

impl<T, const S: usize, A: Allocator> SubAssign<isize> for Cursor<'_, T, S, A> {
    #[inline]
    fn sub_assign(&mut self, rhs: isize) {
        self.raw = self.raw.offset(-rhs);
    }
}

impl<'a, T, const S: usize, A: Allocator> Sub for Cursor<'a, T, S, A> {
    type Output = isize;

    /// Signed distance from `rhs` to `self`.
    #[inline]
    fn sub(self, rhs: Self) -> isize {
        rhs.distance_to(&self)
    }
}
