use core::{fmt, iter::FusedIterator, marker::PhantomData, ptr::NonNull, slice};

use super::cursor::RawCursor;

#[inline]
unsafe fn slot<T, const S: usize>(map: &[NonNull<T>], cursor: RawCursor<S>) -> *mut T {
    unsafe {
        map.get_unchecked(cursor.segment as usize)
            .as_ptr()
            .add(cursor.index)
    }
}

macro_rules! cursor_iterator {
    ($name:ident, $item:ty $(, $mut:tt)?) => {
        impl<'a, T, const S: usize> Iterator for $name<'a, T, S> {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<$item> {
                if self.head == self.tail {
                    return None;
                }
                let item = unsafe { &$($mut)? *slot(self.map, self.head) };
                self.head.increment();
                Some(item)
            }

            #[inline]
            fn size_hint(&self) -> (usize, Option<usize>) {
                let len = self.len();
                (len, Some(len))
            }

            #[inline]
            fn count(self) -> usize {
                self.len()
            }

            fn nth(&mut self, n: usize) -> Option<$item> {
                if n >= self.len() {
                    self.head = self.tail;
                    return None;
                }
                self.head = self.head.offset(n as isize);
                self.next()
            }

            #[inline]
            fn last(mut self) -> Option<$item> {
                self.next_back()
            }
        }

        impl<'a, T, const S: usize> DoubleEndedIterator for $name<'a, T, S> {
            #[inline]
            fn next_back(&mut self) -> Option<$item> {
                if self.head == self.tail {
                    return None;
                }
                self.tail.decrement();
                Some(unsafe { &$($mut)? *slot(self.map, self.tail) })
            }

            fn nth_back(&mut self, n: usize) -> Option<$item> {
                if n >= self.len() {
                    self.tail = self.head;
                    return None;
                }
                self.tail = self.tail.offset(-(n as isize));
                self.next_back()
            }
        }

        impl<T, const S: usize> ExactSizeIterator for $name<'_, T, S> {
            #[inline]
            fn len(&self) -> usize {
                self.head.distance_to(self.tail) as usize
            }
        }

        impl<T, const S: usize> FusedIterator for $name<'_, T, S> {}
    };
}

/// Iterator over the elements of a [`BatchDeque`](super::BatchDeque).
pub struct Iter<'a, T, const S: usize> {
    map: &'a [NonNull<T>],
    head: RawCursor<S>,
    tail: RawCursor<S>,
}

unsafe impl<T: Sync, const S: usize> Send for Iter<'_, T, S> {}

unsafe impl<T: Sync, const S: usize> Sync for Iter<'_, T, S> {}

impl<'a, T, const S: usize> Iter<'a, T, S> {
    #[inline]
    pub(super) fn new(map: &'a [NonNull<T>], begin: usize, end: usize) -> Self {
        Self {
            map,
            head: RawCursor::from_position(begin as isize),
            tail: RawCursor::from_position(end as isize),
        }
    }
}

impl<T, const S: usize> Clone for Iter<'_, T, S> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T: fmt::Debug, const S: usize> fmt::Debug for Iter<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.len()).finish()
    }
}

cursor_iterator!(Iter, &'a T);

/// Mutable iterator over the elements of a [`BatchDeque`](super::BatchDeque).
pub struct IterMut<'a, T, const S: usize> {
    map: &'a [NonNull<T>],
    head: RawCursor<S>,
    tail: RawCursor<S>,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send, const S: usize> Send for IterMut<'_, T, S> {}

unsafe impl<T: Sync, const S: usize> Sync for IterMut<'_, T, S> {}

impl<'a, T, const S: usize> IterMut<'a, T, S> {
    /// The caller must hold a unique borrow of the deque for `'a`.
    #[inline]
    pub(super) fn new(map: &'a [NonNull<T>], begin: usize, end: usize) -> Self {
        Self {
            map,
            head: RawCursor::from_position(begin as isize),
            tail: RawCursor::from_position(end as isize),
            _marker: PhantomData,
        }
    }
}

impl<T: fmt::Debug, const S: usize> fmt::Debug for IterMut<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IterMut").field(&self.len()).finish()
    }
}

cursor_iterator!(IterMut, &'a mut T, mut);

/// Bounds of the used slots of one segment: `(first, len)`.
#[inline]
fn segment_span<const S: usize>(segment: usize, begin: usize, end: usize) -> (usize, usize) {
    let start = segment * S;
    let first = begin.max(start) - start;
    let last = end.min(start + S) - start;
    (first, last - first)
}

macro_rules! segment_iterator {
    ($name:ident, $item:ty, $from_raw:path) => {
        impl<'a, T, const S: usize> $name<'a, T, S> {
            #[inline]
            fn slice_of(&self, segment: usize) -> $item {
                let (first, len) = segment_span::<S>(segment, self.begin, self.end);
                unsafe { $from_raw(self.map[segment].as_ptr().add(first), len) }
            }
        }

        impl<'a, T, const S: usize> Iterator for $name<'a, T, S> {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<$item> {
                if self.front == self.back {
                    return None;
                }
                let segment = self.front;
                self.front += 1;
                Some(self.slice_of(segment))
            }

            #[inline]
            fn size_hint(&self) -> (usize, Option<usize>) {
                let len = self.back - self.front;
                (len, Some(len))
            }
        }

        impl<'a, T, const S: usize> DoubleEndedIterator for $name<'a, T, S> {
            #[inline]
            fn next_back(&mut self) -> Option<$item> {
                if self.front == self.back {
                    return None;
                }
                self.back -= 1;
                Some(self.slice_of(self.back))
            }
        }

        impl<T, const S: usize> ExactSizeIterator for $name<'_, T, S> {}

        impl<T, const S: usize> FusedIterator for $name<'_, T, S> {}
    };
}

/// Segment-wise iterator over a [`BatchDeque`](super::BatchDeque), yielding
/// one slice per used segment.
pub struct Segments<'a, T, const S: usize> {
    map: &'a [NonNull<T>],
    begin: usize,
    end: usize,
    front: usize,
    back: usize,
}

unsafe impl<T: Sync, const S: usize> Send for Segments<'_, T, S> {}

unsafe impl<T: Sync, const S: usize> Sync for Segments<'_, T, S> {}

impl<'a, T, const S: usize> Segments<'a, T, S> {
    pub(super) fn new(map: &'a [NonNull<T>], begin: usize, end: usize) -> Self {
        let (front, back) = used_segments::<S>(begin, end);
        Self {
            map,
            begin,
            end,
            front,
            back,
        }
    }
}

impl<T, const S: usize> Clone for Segments<'_, T, S> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

segment_iterator!(Segments, &'a [T], slice::from_raw_parts);

pub struct SegmentsMut<'a, T, const S: usize> {
    map: &'a [NonNull<T>],
    begin: usize,
    end: usize,
    front: usize,
    back: usize,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send, const S: usize> Send for SegmentsMut<'_, T, S> {}

unsafe impl<T: Sync, const S: usize> Sync for SegmentsMut<'_, T, S> {}

impl<'a, T, const S: usize> SegmentsMut<'a, T, S> {
    pub(super) fn new(map: &'a [NonNull<T>], begin: usize, end: usize) -> Self {
        let (front, back) = used_segments::<S>(begin, end);
        Self {
            map,
            begin,
            end,
            front,
            back,
            _marker: PhantomData,
        }
    }
}

segment_iterator!(SegmentsMut, &'a mut [T], slice::from_raw_parts_mut);

#[inline]
fn used_segments<const S: usize>(begin: usize, end: usize) -> (usize, usize) {
    if begin == end {
        (0, 0)
    } else {
        (begin / S, (end - 1) / S + 1)
    }
}
