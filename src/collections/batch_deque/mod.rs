//! Segmented double-ended queue.
//!
//! A [`BatchDeque`] stores its elements in fixed-size segments of `S` slots
//! each, indexed by a segment map. Pushing at either end never moves existing
//! elements, so references obtained through raw pointers stay valid across
//! `push_front`/`push_back`.
//!
//! Boundaries are stored as absolute slot positions (`segment * S + offset`)
//! counted from the first mapped segment. `end == segment_count() * S` means
//! the last segment is full and the next `push_back` allocates. Segments
//! wholly before `begin` or after `end` are reserved: pushes use them first,
//! and they are freed once that end shrinks past a segment boundary.

mod cursor;
mod into_iter;
mod iter;

use core::{
    cmp, fmt, hash, iter as core_iter,
    marker::PhantomData,
    mem,
    ops::{self, Index, IndexMut, RangeBounds},
    ptr::{self, NonNull},
};

use allocator_api2::alloc::{Allocator, Global};
use log::trace;

pub use cursor::Cursor;
pub use into_iter::IntoIter;
pub use iter::{Iter, IterMut, Segments, SegmentsMut};

use super::{
    devector::{Aggressive, Devector},
    raw,
};
use crate::{
    error::{CapacityError, RangeError, handle_capacity_error},
    slice::checked_range,
};

type SegmentMap<T, A> = Devector<NonNull<T>, 0, Aggressive, A>;

/// Double-ended queue made of segments of `S` elements.
pub struct BatchDeque<T, const S: usize, A: Allocator = Global> {
    map: SegmentMap<T, A>,
    begin: usize,
    end: usize,
    retain_spare: bool,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, const S: usize, A: Allocator + Send> Send for BatchDeque<T, S, A> {}

unsafe impl<T: Sync, const S: usize, A: Allocator + Sync> Sync for BatchDeque<T, S, A> {}

impl<T, const S: usize> BatchDeque<T, S> {
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn from_default(count: usize) -> Self
    where
        T: Default,
    {
        Self::from_default_in(count, Global)
    }

    pub fn from_elem(count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(count, value, Global)
    }

    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(values, Global)
    }
}

impl<T, const S: usize, A: Allocator> BatchDeque<T, S, A> {
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        const { assert!(S > 0, "segment size must be non-zero") };
        Self {
            map: Devector::new_in(alloc),
            begin: 0,
            end: 0,
            retain_spare: false,
            _marker: PhantomData,
        }
    }

    pub fn from_default_in(count: usize, alloc: A) -> Self
    where
        T: Default,
    {
        let mut deque = Self::new_in(alloc);
        deque.reserve_back_slots_or_panic(count);
        for _ in 0..count {
            deque.push_back(T::default());
        }
        deque
    }

    pub fn from_elem_in(count: usize, value: T, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut deque = Self::new_in(alloc);
        deque.extend(core_iter::repeat_n(value, count));
        deque
    }

    pub fn from_slice_in(values: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        let mut deque = Self::new_in(alloc);
        deque.extend(values.iter().cloned());
        deque
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        self.map.allocator()
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Largest supported length. Positions must stay addressable by `isize`.
    #[inline]
    pub const fn max_size(&self) -> usize {
        let max = raw::max_size::<T>();
        let positions = isize::MAX as usize / 2;
        if max < positions { max } else { positions }
    }

    /// Number of allocated segments.
    #[inline]
    pub const fn segment_count(&self) -> usize {
        self.map.len()
    }

    /// Keep one empty segment around when the deque runs empty, so that
    /// alternating pushes and pops at the boundary do not allocate.
    pub fn set_retain_spare_segment(&mut self, retain: bool) {
        self.retain_spare = retain;
        if self.is_empty() {
            self.reset_empty();
        }
    }

    #[inline]
    pub const fn retains_spare_segment(&self) -> bool {
        self.retain_spare
    }

    /// Makes sure `new_capacity - len()` elements can be pushed at the back
    /// without allocating a segment.
    ///
    /// Reserved segments are given back once the elements at that end are
    /// popped or erased past a segment boundary, and by
    /// [`shrink_to_fit`](Self::shrink_to_fit).
    pub fn try_reserve_back(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        self.reserve_back_slots(new_capacity.saturating_sub(self.len()))
    }

    /// Makes sure `new_capacity - len()` elements can be pushed at the front
    /// without allocating a segment.
    pub fn try_reserve_front(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        self.reserve_front_slots(new_capacity.saturating_sub(self.len()))
    }

    #[inline]
    pub fn try_reserve(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        self.try_reserve_back(new_capacity)
    }

    pub fn reserve_back(&mut self, new_capacity: usize) {
        if let Err(err) = self.try_reserve_back(new_capacity) {
            handle_capacity_error(err)
        }
    }

    pub fn reserve_front(&mut self, new_capacity: usize) {
        if let Err(err) = self.try_reserve_front(new_capacity) {
            handle_capacity_error(err)
        }
    }

    #[inline]
    pub fn reserve(&mut self, new_capacity: usize) {
        self.reserve_back(new_capacity)
    }

    /// Frees reserved and spare segments and the unused part of the segment
    /// map.
    pub fn shrink_to_fit(&mut self) {
        if self.is_empty() {
            let retain = mem::replace(&mut self.retain_spare, false);
            self.reset_empty();
            self.retain_spare = retain;
        } else {
            self.release_front(0);
            self.release_back(0);
        }
        self.map.shrink_to_fit();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            Some(unsafe { &*self.slot(self.begin + index) })
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            Some(unsafe { &mut *self.slot(self.begin + index) })
        } else {
            None
        }
    }

    pub fn at(&self, index: usize) -> Result<&T, RangeError> {
        let len = self.len();
        self.get(index).ok_or(RangeError::OutOfBounds { index, len })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, RangeError> {
        let len = self.len();
        self.get_mut(index)
            .ok_or(RangeError::OutOfBounds { index, len })
    }

    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len().checked_sub(1).and_then(|index| self.get_mut(index))
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter::new(&self.map, self.begin, self.end)
    }

    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T, S> {
        IterMut::new(&self.map, self.begin, self.end)
    }

    /// Contiguous runs of elements, one per segment, front to back.
    #[inline]
    pub fn segments(&self) -> Segments<'_, T, S> {
        Segments::new(&self.map, self.begin, self.end)
    }

    #[inline]
    pub fn segments_mut(&mut self) -> SegmentsMut<'_, T, S> {
        SegmentsMut::new(&self.map, self.begin, self.end)
    }

    /// Cursor on the first element.
    #[inline]
    pub fn cursor_front(&self) -> Cursor<'_, T, S, A> {
        Cursor::new(self, self.begin as isize)
    }

    /// Cursor one past the last element.
    #[inline]
    pub fn cursor_back(&self) -> Cursor<'_, T, S, A> {
        Cursor::new(self, self.end as isize)
    }

    /// Cursor on the element at `index`, or past the end if `index == len()`.
    #[inline]
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, S, A> {
        Cursor::new(self, self.begin as isize + index as isize)
    }

    pub fn push_back(&mut self, value: T) {
        if self.end == self.map.len() * S {
            if let Err(err) = self.push_back_segment() {
                handle_capacity_error(err)
            }
        }
        unsafe { self.slot(self.end).write(value) };
        self.end += 1;
    }

    pub fn push_front(&mut self, value: T) {
        if self.begin == 0 {
            if let Err(err) = self.push_front_segment() {
                handle_capacity_error(err)
            }
        }
        self.begin -= 1;
        unsafe { self.slot(self.begin).write(value) };
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.end -= 1;
        let value = unsafe { self.slot(self.end).read() };
        if self.end % S == 0 || self.is_empty() {
            self.trim_back();
        }
        Some(value)
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = unsafe { self.slot(self.begin).read() };
        self.begin += 1;
        if self.begin % S == 0 || self.is_empty() {
            self.trim_front();
        }
        Some(value)
    }

    /// Inserts `value` before the element at `index`, moving whichever side
    /// of `index` is shorter.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.insert_exact(index, 1, core_iter::once(value));
    }

    pub fn insert_n(&mut self, index: usize, count: usize, value: T)
    where
        T: Clone,
    {
        self.insert_exact(index, count, core_iter::repeat_n(value, count));
    }

    pub fn insert_slice(&mut self, index: usize, values: &[T])
    where
        T: Clone,
    {
        self.insert_exact(index, values.len(), values.iter().cloned());
    }

    /// Inserts the items of `iter` before the element at `index`. The deque is
    /// left unchanged if the iterator panics.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => {
                self.insert_exact(index, lower, iter);
            }
            _ => {
                let buffered: Vec<T> = iter.collect();
                self.insert_exact(index, buffered.len(), buffered.into_iter());
            }
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        let len = self.len();
        if index >= len {
            return None;
        }
        let begin = self.begin;
        unsafe {
            let value = self.slot(begin + index).read();
            if index < len - index - 1 {
                self.move_slots(begin, begin + 1, index);
                self.begin += 1;
                self.trim_front();
            } else {
                self.move_slots(begin + index + 1, begin + index, len - index - 1);
                self.end -= 1;
                self.trim_back();
            }
            Some(value)
        }
    }

    /// Drops the elements in `range` and closes the gap from the shorter side.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn erase<R>(&mut self, range: R)
    where
        R: RangeBounds<usize>,
    {
        let len = self.len();
        let ops::Range { start, end } = checked_range(range, len);
        if start == end {
            return;
        }
        let guard = CloseGap {
            deque: self,
            start,
            end,
            len,
        };
        let first = guard.deque.begin + start;
        unsafe { guard.deque.drop_slots(first, end - start) };
    }

    /// Keeps the first `len` elements.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        let first = self.begin + len;
        self.end = first;
        unsafe { self.drop_slots(first, old_len - len) };
        self.trim_back();
    }

    /// Keeps the last `len` elements.
    pub fn truncate_front(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        let first = self.begin;
        self.begin = self.end - len;
        unsafe { self.drop_slots(first, old_len - len) };
        self.trim_front();
    }

    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        let len = self.len();
        if new_len > len {
            self.extend(core_iter::repeat_n(value, new_len - len));
        } else {
            self.truncate(new_len);
        }
    }

    pub fn resize_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        let len = self.len();
        if new_len > len {
            self.extend(core_iter::repeat_with(f).take(new_len - len));
        } else {
            self.truncate(new_len);
        }
    }

    /// Like [`resize`](Self::resize), but adds and removes at the front.
    pub fn resize_front(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        let len = self.len();
        if new_len <= len {
            return self.truncate_front(new_len);
        }
        for value in core_iter::repeat_n(value, new_len - len) {
            self.push_front(value);
        }
    }

    pub fn resize_front_with<F>(&mut self, new_len: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        let len = self.len();
        if new_len <= len {
            return self.truncate_front(new_len);
        }
        for _ in len..new_len {
            self.push_front(f());
        }
    }

    /// Replaces the contents with the items of `iter`, reusing the live
    /// elements' slots. If `iter` panics, the items assigned so far stay.
    pub fn assign<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut iter = iter.into_iter();
        let mut written = 0;
        for (slot, value) in self.iter_mut().zip(&mut iter) {
            *slot = value;
            written += 1;
        }
        if written < self.len() {
            self.truncate(written);
        } else {
            self.extend(iter);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Exchanges the contents of two deques, allocators included.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Moves every element of `other` to the back of `self`.
    pub fn append(&mut self, other: &mut Self) {
        let count = other.len();
        if count == 0 {
            return;
        }
        self.reserve_back_slots_or_panic(count);
        let mut src = other.begin;
        let mut left = count;
        while left > 0 {
            let chunk = (S - src % S).min(S - self.end % S).min(left);
            unsafe { ptr::copy_nonoverlapping(other.slot(src), self.slot(self.end), chunk) };
            src += chunk;
            self.end += chunk;
            left -= chunk;
        }
        other.end = other.begin;
        other.reset_empty();
    }

    /// Splits the deque in two at `at`, returning the elements from `at` on.
    ///
    /// Whole segments are handed over as they are; at most one partially used
    /// segment is copied.
    ///
    /// # Panics
    ///
    /// Panics if `at > len()`.
    pub fn split_off(&mut self, at: usize) -> Self
    where
        A: Clone,
    {
        let len = self.len();
        assert!(at <= len, "`at` split index (is {at}) should be <= len (is {len})");
        let mut other = Self::new_in(self.allocator().clone());
        other.retain_spare = self.retain_spare;
        if at == len {
            return other;
        }

        let split = self.begin + at;
        let first_whole = split.div_ceil(S);
        let whole = self.map.len() - first_whole;
        let partial = split % S != 0;
        if let Err(err) = other.map.try_reserve_back(whole + usize::from(partial)) {
            handle_capacity_error(err)
        }
        if partial {
            if let Err(err) = other.push_back_segment() {
                handle_capacity_error(err)
            }
            let count = self.end.min(first_whole * S) - split;
            unsafe { ptr::copy_nonoverlapping(self.slot(split), other.slot(split % S), count) };
            other.begin = split % S;
        }
        for segment in self.map.drain(first_whole..) {
            unsafe { other.map.unsafe_push_back(segment) };
        }
        other.end = other.begin + (len - at);
        self.end = split;
        self.trim_back();
        trace!("batch deque split at {at}: {whole} segments handed over");
        other
    }

    /// Inserts the items of `iter` before the element at `index` without
    /// moving any element before `index` nor any inserted element.
    ///
    /// The new elements are constructed in the slots right after the
    /// element at `index - 1`; the elements from `index` on are moved behind
    /// them, whole segments at a time when the inserted count is a multiple of
    /// `S`. The deque is left unchanged if the iterator panics.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn stable_insert<I>(&mut self, index: usize, iter: I)
    where
        I: IntoIterator<Item = T>,
        A: Clone,
    {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        let suffix = self.split_off(index);
        let mut guard = StableInsertGuard {
            deque: self,
            prefix_len: index,
            suffix,
        };
        for value in iter {
            guard.deque.push_back(value);
        }
        let mut suffix = mem::replace(&mut guard.suffix, Self::new_in(guard.deque.allocator().clone()));
        mem::forget(guard);
        unsafe { self.splice_back(&mut suffix) };
    }

    /// Appends `other`, handing whole segments over when both deques agree on
    /// the slot offset at the seam.
    ///
    /// # Safety
    ///
    /// The allocators of `self` and `other` must be able to free each other's
    /// segments, e.g. `other` was split off `self`.
    unsafe fn splice_back(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            let retain = self.retain_spare;
            mem::swap(self, other);
            self.retain_spare = retain;
            return;
        }
        if self.end % S != other.begin % S {
            return self.append(other);
        }
        // the seam must sit at the last segment of `self` and the first of `other`
        self.release_back(0);
        other.release_front(0);
        if let Err(err) = self.map.try_grow_back(other.map.len()) {
            handle_capacity_error(err)
        }
        if self.end % S != 0 {
            // fill up the seam segment from the first segment of `other`
            let count = other.end.min(S) - other.begin;
            unsafe { ptr::copy_nonoverlapping(other.slot(other.begin), self.slot(self.end), count) };
            self.end += count;
            other.begin += count;
            if other.is_empty() {
                return other.reset_empty();
            }
            other.trim_front();
        }
        let spliced = other.map.len();
        for segment in other.map.drain(..) {
            unsafe { self.map.unsafe_push_back(segment) };
        }
        self.end += other.end;
        other.begin = 0;
        other.end = 0;
        other.reset_empty();
        trace!("batch deque spliced {spliced} segments");
    }

    /// Pointer to the slot at absolute position `pos`, whose segment must be
    /// mapped.
    #[inline]
    fn slot(&self, pos: usize) -> *mut T {
        debug_assert!(pos / S < self.map.len());
        unsafe { self.map.get_unchecked(pos / S).as_ptr().add(pos % S) }
    }

    fn allocate_segment(&self) -> Result<NonNull<T>, CapacityError> {
        raw::allocate_array::<T, A>(self.map.allocator(), S)
    }

    /// # Safety
    ///
    /// `segment` must come from [`allocate_segment`](Self::allocate_segment)
    /// and hold no live element.
    unsafe fn deallocate_segment(&self, segment: NonNull<T>) {
        unsafe { raw::deallocate_array(self.map.allocator(), segment, S) };
    }

    #[cold]
    fn push_back_segment(&mut self) -> Result<(), CapacityError> {
        self.map.try_grow_back(1)?;
        let segment = self.allocate_segment()?;
        unsafe { self.map.unsafe_push_back(segment) };
        trace!("batch deque allocated back segment, {} in use", self.map.len());
        Ok(())
    }

    #[cold]
    fn push_front_segment(&mut self) -> Result<(), CapacityError> {
        self.map.try_grow_front(1)?;
        let segment = self.allocate_segment()?;
        unsafe { self.map.unsafe_push_front(segment) };
        self.begin += S;
        self.end += S;
        trace!("batch deque allocated front segment, {} in use", self.map.len());
        Ok(())
    }

    fn check_len(&self, additional: usize) -> Result<(), CapacityError> {
        let max_size = self.max_size();
        match self.len().checked_add(additional) {
            Some(required) if required <= max_size => Ok(()),
            _ => Err(CapacityError::CapacityOverflow {
                requested: self.len().saturating_add(additional),
                max_size,
            }),
        }
    }

    /// Allocates segments until `count` slots are free before `begin`.
    fn reserve_front_slots(&mut self, count: usize) -> Result<(), CapacityError> {
        if self.begin >= count {
            return Ok(());
        }
        self.check_len(count)?;
        let segments = (count - self.begin).div_ceil(S);
        self.map.try_grow_front(segments)?;
        for _ in 0..segments {
            if let Err(err) = self.push_front_segment() {
                self.trim_front();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Allocates segments until `count` slots are free after `end`.
    fn reserve_back_slots(&mut self, count: usize) -> Result<(), CapacityError> {
        let free = self.map.len() * S - self.end;
        if free >= count {
            return Ok(());
        }
        self.check_len(count)?;
        let segments = (count - free).div_ceil(S);
        self.map.try_grow_back(segments)?;
        for _ in 0..segments {
            if let Err(err) = self.push_back_segment() {
                self.trim_back();
                return Err(err);
            }
        }
        Ok(())
    }

    #[inline]
    fn reserve_back_slots_or_panic(&mut self, count: usize) {
        if let Err(err) = self.reserve_back_slots(count) {
            handle_capacity_error(err)
        }
    }

    /// Allocated segments entirely before `begin`.
    #[inline]
    fn spare_front(&self) -> usize {
        self.begin / S
    }

    /// Allocated segments entirely after `end`.
    #[inline]
    fn spare_back(&self) -> usize {
        self.map.len() - self.end.div_ceil(S)
    }

    /// Frees the segments in front of the one holding the first element.
    fn trim_front(&mut self) {
        if self.is_empty() {
            return self.reset_empty();
        }
        self.release_front(0);
    }

    /// Frees the segments behind the one holding the last element.
    fn trim_back(&mut self) {
        if self.is_empty() {
            return self.reset_empty();
        }
        self.release_back(0);
    }

    /// Frees spare front segments until at most `keep` are left.
    fn release_front(&mut self, keep: usize) {
        let unused = self.spare_front().saturating_sub(keep);
        if unused == 0 {
            return;
        }
        for _ in 0..unused {
            if let Some(segment) = self.map.pop_front() {
                unsafe { self.deallocate_segment(segment) };
            }
        }
        self.begin -= unused * S;
        self.end -= unused * S;
        trace!("batch deque released {unused} front segments, {} in use", self.map.len());
    }

    /// Frees spare back segments until at most `keep` are left.
    fn release_back(&mut self, keep: usize) {
        let unused = self.spare_back().saturating_sub(keep);
        if unused == 0 {
            return;
        }
        for _ in 0..unused {
            if let Some(segment) = self.map.pop_back() {
                unsafe { self.deallocate_segment(segment) };
            }
        }
        trace!("batch deque released {unused} back segments, {} in use", self.map.len());
    }

    /// Settles an empty deque: every segment is freed, except one centred
    /// spare segment when retention is on. A single-slot segment cannot leave
    /// room at both ends, so it is never kept.
    fn reset_empty(&mut self) {
        debug_assert!(self.is_empty());
        let keep = usize::from(self.retain_spare && S > 1);
        while self.map.len() > keep {
            if let Some(segment) = self.map.pop_back() {
                unsafe { self.deallocate_segment(segment) };
            }
        }
        let offset = if self.map.is_empty() { 0 } else { S / 2 };
        self.begin = offset;
        self.end = offset;
    }

    /// Moves `count` slots from position `src` to position `dst`, like
    /// [`ptr::copy`] across segment boundaries.
    ///
    /// # Safety
    ///
    /// Both ranges must lie in mapped segments and the source must be
    /// initialized.
    unsafe fn move_slots(&mut self, src: usize, dst: usize, count: usize) {
        if src == dst || count == 0 {
            return;
        }
        if dst < src {
            let mut done = 0;
            while done < count {
                let (s, d) = (src + done, dst + done);
                let chunk = (S - s % S).min(S - d % S).min(count - done);
                unsafe { ptr::copy(self.slot(s), self.slot(d), chunk) };
                done += chunk;
            }
        } else {
            let mut left = count;
            while left > 0 {
                let (s_end, d_end) = (src + left, dst + left);
                let chunk = ((s_end - 1) % S + 1).min((d_end - 1) % S + 1).min(left);
                unsafe { ptr::copy(self.slot(s_end - chunk), self.slot(d_end - chunk), chunk) };
                left -= chunk;
            }
        }
    }

    /// # Safety
    ///
    /// The `count` slots from `start` must be initialized and are considered
    /// uninitialized afterwards.
    unsafe fn drop_slots(&self, mut start: usize, mut count: usize) {
        if !mem::needs_drop::<T>() {
            return;
        }
        while count > 0 {
            let chunk = (S - start % S).min(count);
            unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.slot(start), chunk)) };
            start += chunk;
            count -= chunk;
        }
    }

    /// Opens a `count` slot gap before `index` on the cheaper side and fills it
    /// from `iter`. Returns how many items were written. A panicking `iter`
    /// leaves the deque unchanged.
    fn insert_exact<I>(&mut self, index: usize, count: usize, iter: I) -> usize
    where
        I: Iterator<Item = T>,
    {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        if count == 0 {
            return 0;
        }
        let at_front = index <= len / 2;
        let spare = (self.spare_front(), self.spare_back());
        let reserved = if at_front {
            self.reserve_front_slots(count)
        } else {
            self.reserve_back_slots(count)
        };
        if let Err(err) = reserved {
            handle_capacity_error(err)
        }

        let (orig_begin, orig_end) = (self.begin, self.end);
        unsafe {
            if at_front {
                self.move_slots(orig_begin, orig_begin - count, index);
            } else {
                self.move_slots(orig_begin + index, orig_begin + index + count, len - index);
            }
        }
        // nothing is live until the gap guard settles the boundaries
        self.end = self.begin;

        let mut gap = GapGuard {
            deque: self,
            orig_begin,
            orig_end,
            index,
            count,
            at_front,
            spare,
            filled: 0,
        };
        let gap_start = gap.gap_start();
        for value in iter.take(count) {
            unsafe { gap.deque.slot(gap_start + gap.filled).write(value) };
            gap.filled += 1;
        }
        gap.commit()
    }
}

/// Gap opened by an insertion. Dropping it without
/// [`commit`](Self::commit) destroys what was written into the gap and moves
/// everything back.
struct GapGuard<'a, T, const S: usize, A: Allocator> {
    deque: &'a mut BatchDeque<T, S, A>,
    orig_begin: usize,
    orig_end: usize,
    index: usize,
    count: usize,
    at_front: bool,
    /// Spare segments at each end before the insertion; any beyond are freed.
    spare: (usize, usize),
    filled: usize,
}

impl<T, const S: usize, A: Allocator> GapGuard<'_, T, S, A> {
    #[inline]
    fn gap_start(&self) -> usize {
        if self.at_front {
            self.orig_begin - self.count + self.index
        } else {
            self.orig_begin + self.index
        }
    }

    fn release(&mut self) {
        self.deque.release_front(self.spare.0);
        self.deque.release_back(self.spare.1);
    }

    fn commit(mut self) -> usize {
        let gap_start = self.gap_start();
        let filled = self.filled;
        let missing = self.count - filled;
        let suffix = self.orig_end - self.orig_begin - self.index;
        unsafe {
            if self.at_front {
                let begin = self.orig_begin - self.count;
                self.deque
                    .move_slots(begin, begin + missing, self.index + filled);
                self.deque.begin = begin + missing;
                self.deque.end = self.orig_end;
            } else {
                self.deque
                    .move_slots(gap_start + self.count, gap_start + filled, suffix);
                self.deque.begin = self.orig_begin;
                self.deque.end = self.orig_end + filled;
            }
        }
        self.release();
        mem::forget(self);
        filled
    }
}

impl<T, const S: usize, A: Allocator> Drop for GapGuard<'_, T, S, A> {
    fn drop(&mut self) {
        let gap_start = self.gap_start();
        let suffix = self.orig_end - self.orig_begin - self.index;
        unsafe {
            self.deque.drop_slots(gap_start, self.filled);
            if self.at_front {
                self.deque
                    .move_slots(self.orig_begin - self.count, self.orig_begin, self.index);
            } else {
                self.deque
                    .move_slots(gap_start + self.count, gap_start, suffix);
            }
        }
        self.deque.begin = self.orig_begin;
        self.deque.end = self.orig_end;
        self.release();
    }
}

/// Closes the hole left by [`BatchDeque::erase`], even if a destructor
/// panics.
struct CloseGap<'a, T, const S: usize, A: Allocator> {
    deque: &'a mut BatchDeque<T, S, A>,
    start: usize,
    end: usize,
    len: usize,
}

impl<T, const S: usize, A: Allocator> Drop for CloseGap<'_, T, S, A> {
    fn drop(&mut self) {
        let begin = self.deque.begin;
        let removed = self.end - self.start;
        unsafe {
            if self.start < self.len - self.end {
                self.deque.move_slots(begin, begin + removed, self.start);
                self.deque.begin += removed;
                self.deque.trim_front();
            } else {
                self.deque
                    .move_slots(begin + self.end, begin + self.start, self.len - self.end);
                self.deque.end -= removed;
                self.deque.trim_back();
            }
        }
    }
}

/// Puts the split-off suffix back if the iterator of
/// [`BatchDeque::stable_insert`] panics.
struct StableInsertGuard<'a, T, const S: usize, A: Allocator> {
    deque: &'a mut BatchDeque<T, S, A>,
    prefix_len: usize,
    suffix: BatchDeque<T, S, A>,
}

impl<T, const S: usize, A: Allocator> Drop for StableInsertGuard<'_, T, S, A> {
    fn drop(&mut self) {
        self.deque.truncate(self.prefix_len);
        unsafe { self.deque.splice_back(&mut self.suffix) };
    }
}

/// Frees the back segments reserved for a size hint that was not met, even
/// if the iterator panics.
struct ReleaseBack<'a, T, const S: usize, A: Allocator> {
    deque: &'a mut BatchDeque<T, S, A>,
    keep: usize,
}

impl<T, const S: usize, A: Allocator> Drop for ReleaseBack<'_, T, S, A> {
    fn drop(&mut self) {
        self.deque.release_back(self.keep);
    }
}

impl<T, const S: usize, A: Allocator> Drop for BatchDeque<T, S, A> {
    fn drop(&mut self) {
        unsafe { self.drop_slots(self.begin, self.len()) };
        while let Some(segment) = self.map.pop_back() {
            unsafe { self.deallocate_segment(segment) };
        }
    }
}

impl<T, const S: usize, A: Allocator + Default> Default for BatchDeque<T, S, A> {
    #[inline]
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, const S: usize, A: Allocator + Clone> Clone for BatchDeque<T, S, A> {
    /// Clones segment by segment, keeping the offset of the first element.
    fn clone(&self) -> Self {
        let mut other = Self::new_in(self.allocator().clone());
        other.retain_spare = self.retain_spare;
        if self.is_empty() {
            return other;
        }
        if let Err(err) = other.map.try_reserve_back(self.map.len()) {
            handle_capacity_error(err)
        }
        if let Err(err) = other.push_back_segment() {
            handle_capacity_error(err)
        }
        other.begin = self.begin % S;
        other.end = other.begin;
        for value in self {
            other.push_back(value.clone());
        }
        other
    }
}

impl<T, const S: usize, A: Allocator> Index<usize> for BatchDeque<T, S, A> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, index: usize) -> &T {
        let len = self.len();
        self.get(index)
            .unwrap_or_else(|| panic!("index (is {index}) should be < len (is {len})"))
    }
}

impl<T, const S: usize, A: Allocator> IndexMut<usize> for BatchDeque<T, S, A> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        self.get_mut(index)
            .unwrap_or_else(|| panic!("index (is {index}) should be < len (is {len})"))
    }
}

impl<T: PartialEq, const S: usize, A: Allocator> PartialEq for BatchDeque<T, S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq, const S: usize, A: Allocator> PartialEq<[T]> for BatchDeque<T, S, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq, const S: usize, const M: usize, A: Allocator> PartialEq<[T; M]>
    for BatchDeque<T, S, A>
{
    fn eq(&self, other: &[T; M]) -> bool {
        *self == other[..]
    }
}

impl<T: Eq, const S: usize, A: Allocator> Eq for BatchDeque<T, S, A> {}

impl<T: PartialOrd, const S: usize, A: Allocator> PartialOrd for BatchDeque<T, S, A> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, const S: usize, A: Allocator> Ord for BatchDeque<T, S, A> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: hash::Hash, const S: usize, A: Allocator> hash::Hash for BatchDeque<T, S, A> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        self.iter().for_each(|elem| elem.hash(state));
    }
}

impl<T: fmt::Debug, const S: usize, A: Allocator> fmt::Debug for BatchDeque<T, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, const S: usize, A: Allocator> Extend<T> for BatchDeque<T, S, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut guard = ReleaseBack {
            keep: self.spare_back(),
            deque: self,
        };
        guard.deque.reserve_back_slots_or_panic(lower);
        for value in iter {
            guard.deque.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, const S: usize, A: Allocator> Extend<&'a T> for BatchDeque<T, S, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const S: usize, A: Allocator + Default> FromIterator<T> for BatchDeque<T, S, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::new_in(A::default());
        deque.extend(iter);
        deque
    }
}

impl<T, const S: usize, const M: usize, A: Allocator + Default> From<[T; M]>
    for BatchDeque<T, S, A>
{
    fn from(value: [T; M]) -> Self {
        Self::from_iter(value)
    }
}

impl<T, const S: usize, A: Allocator> IntoIterator for BatchDeque<T, S, A> {
    type Item = T;
    type IntoIter = IntoIter<T, S, A>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, const S: usize, A: Allocator> IntoIterator for &'a BatchDeque<T, S, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, S>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const S: usize, A: Allocator> IntoIterator for &'a mut BatchDeque<T, S, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, S>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::test_utils::{CountingAlloc, Tracked, values};

    fn collect<const S: usize, A: Allocator>(deque: &BatchDeque<i32, S, A>) -> Vec<i32> {
        deque.iter().copied().collect()
    }

    #[test]
    fn t_pop_front_releases_segments() {
        let alloc = CountingAlloc::default();
        let counter = Tracked::counter();
        let mut deque = BatchDeque::<Tracked, 8, _>::new_in(alloc.clone());
        for value in 1..=20 {
            deque.push_back(Tracked::new(value));
        }
        assert_eq!(deque.segment_count(), 3);
        assert_eq!(values(&deque), (1..=20).collect::<Vec<_>>());

        for value in 1..=20 {
            assert_eq!(deque.pop_front().map(|t| t.value()), Some(value));
        }
        assert!(deque.is_empty());
        assert_eq!(deque.segment_count(), 0);
        assert_eq!(counter.live(), 0);
        // only the segment map is left
        assert_eq!(alloc.live(), 1);
        drop(deque);
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn t_push_keeps_addresses() {
        let mut deque = BatchDeque::<i32, 4>::new();
        deque.push_back(1);
        let first = &deque[0] as *const i32;
        for value in 0..50 {
            deque.push_front(value);
            deque.push_back(value);
        }
        assert_eq!(&deque[50] as *const i32, first);
        assert_eq!(deque.len(), 101);
        assert_eq!(deque.front(), Some(&49));
        assert_eq!(deque.back(), Some(&49));

        while deque.len() > 1 {
            deque.pop_front();
            deque.pop_back();
        }
        assert_eq!(&deque[0] as *const i32, first);
        assert_eq!(deque.segment_count(), 1);
    }

    #[test]
    fn t_pop_back_releases_segments() {
        let mut deque: BatchDeque<i32, 3> = (0..7).collect();
        assert_eq!(deque.segment_count(), 3);
        assert_eq!(deque.pop_back(), Some(6));
        assert_eq!(deque.segment_count(), 2);
        assert_eq!(deque.pop_back(), Some(5));
        assert_eq!(deque.segment_count(), 2);
        while deque.pop_back().is_some() {}
        assert_eq!(deque.segment_count(), 0);
        assert_eq!(deque.pop_back(), None);
        assert_eq!(deque.pop_front(), None);
    }

    #[test]
    fn t_insert_and_remove() {
        let mut deque: BatchDeque<i32, 4> = (0..10).collect();
        let mut model: Vec<i32> = (0..10).collect();

        deque.insert(2, 100);
        model.insert(2, 100);
        deque.insert(9, 200);
        model.insert(9, 200);
        assert_eq!(collect(&deque), model);

        deque.insert_slice(1, &[7, 8, 9, 10, 11, 12]);
        model.splice(1..1, [7, 8, 9, 10, 11, 12]);
        deque.insert_n(15, 5, -1);
        model.splice(15..15, [-1; 5]);
        deque.insert_iter(0, (0..3).filter(|v| v % 2 == 0));
        model.splice(0..0, [0, 2]);
        deque.insert_iter(model.len(), [42]);
        model.push(42);
        assert_eq!(collect(&deque), model);

        for index in [0, 3, 20, 10] {
            assert_eq!(deque.remove(index), Some(model.remove(index)));
        }
        assert_eq!(deque.remove(model.len() - 1), model.pop());
        assert_eq!(deque.remove(model.len()), None);
        assert_eq!(collect(&deque), model);
        let used: usize = deque.segments().map(<[i32]>::len).sum();
        assert_eq!(used, model.len());
    }

    #[test]
    fn t_insert_into_empty() {
        let mut deque = BatchDeque::<i32, 4>::new();
        deque.insert_slice(0, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(deque, [1, 2, 3, 4, 5, 6]);
        assert_eq!(deque.segment_count(), 2);

        let mut deque = BatchDeque::<i32, 4>::new();
        deque.insert_iter(0, core::iter::empty());
        assert_eq!(deque.segment_count(), 0);
    }

    #[test]
    #[should_panic]
    fn t_insert_out_of_bounds() {
        let mut deque: BatchDeque<i32, 4> = (0..3).collect();
        deque.insert(4, 0);
    }

    #[test]
    fn t_insert_is_strong() {
        let counter = Tracked::counter();
        let mut deque: BatchDeque<Tracked, 4> = (0..10).map(Tracked::new).collect();
        let segments = deque.segment_count();

        for index in [2, 8] {
            counter.panic_on(3);
            let result = catch_unwind(AssertUnwindSafe(|| {
                deque.insert_n(index, 5, Tracked::new(-1));
            }));
            assert!(result.is_err());
            assert_eq!(values(&deque), (0..10).collect::<Vec<_>>());
            assert_eq!(deque.segment_count(), segments);
            assert_eq!(counter.live(), 10);
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            deque.insert_iter(
                5,
                (0..4).map(|v| match v {
                    2 => panic!("iterator failed"),
                    _ => Tracked::new(v),
                }),
            );
        }));
        assert!(result.is_err());
        assert_eq!(values(&deque), (0..10).collect::<Vec<_>>());
        assert_eq!(counter.live(), 10);
    }

    #[test]
    fn t_erase_and_truncate() {
        let mut deque: BatchDeque<i32, 4> = (0..20).collect();
        let mut model: Vec<i32> = (0..20).collect();

        deque.erase(2..5);
        model.drain(2..5);
        deque.erase(12..);
        model.drain(12..);
        deque.erase(3..3);
        assert_eq!(collect(&deque), model);
        assert_eq!(deque.segment_count(), 4);

        deque.truncate(5);
        model.truncate(5);
        assert_eq!(collect(&deque), model);
        assert_eq!(deque.segment_count(), 2);

        deque.truncate_front(2);
        assert_eq!(deque, [model[3], model[4]]);
        assert_eq!(deque.segment_count(), 1);

        deque.erase(..);
        assert!(deque.is_empty());
        assert_eq!(deque.segment_count(), 0);
    }

    #[test]
    fn t_erase_drops() {
        let counter = Tracked::counter();
        let mut deque: BatchDeque<Tracked, 3> = (0..9).map(Tracked::new).collect();
        deque.erase(1..7);
        assert_eq!(values(&deque), [0, 7, 8]);
        assert_eq!(counter.live(), 3);
        deque.clear();
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn t_resize_and_assign() {
        let mut deque = BatchDeque::<i32, 4>::new();
        deque.resize(6, 7);
        assert_eq!(deque, [7; 6]);
        deque.resize_front(8, 1);
        assert_eq!(deque, [1, 1, 7, 7, 7, 7, 7, 7]);
        deque.resize_front(3, 0);
        assert_eq!(deque, [7, 7, 7]);

        let mut next = 0;
        deque.resize_with(5, || {
            next += 1;
            next
        });
        assert_eq!(deque, [7, 7, 7, 1, 2]);
        deque.resize_front_with(6, || 9);
        assert_eq!(deque, [9, 7, 7, 7, 1, 2]);

        deque.assign(0..3);
        assert_eq!(deque, [0, 1, 2]);
        deque.assign(0..12);
        assert_eq!(collect(&deque), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn t_retain_spare_segment() {
        let alloc = CountingAlloc::default();
        let mut deque = BatchDeque::<i32, 8, _>::new_in(alloc.clone());
        deque.set_retain_spare_segment(true);
        assert!(deque.retains_spare_segment());

        deque.push_back(1);
        assert_eq!(alloc.live(), 2);
        assert_eq!(deque.pop_front(), Some(1));
        assert_eq!(deque.segment_count(), 1);
        for value in 0..100 {
            deque.push_front(value);
            assert_eq!(deque.pop_back(), Some(value));
        }
        assert_eq!(alloc.live(), 2);

        deque.set_retain_spare_segment(false);
        assert_eq!(deque.segment_count(), 0);
        assert_eq!(alloc.live(), 1);
        deque.shrink_to_fit();
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn t_append_and_split_off() {
        let mut deque: BatchDeque<i32, 4> = (0..5).collect();
        let mut other: BatchDeque<i32, 4> = (5..12).collect();
        deque.append(&mut other);
        assert_eq!(collect(&deque), (0..12).collect::<Vec<_>>());
        assert!(other.is_empty());
        assert_eq!(other.segment_count(), 0);

        let tail = deque.split_off(6);
        assert_eq!(deque, [0, 1, 2, 3, 4, 5]);
        assert_eq!(tail, [6, 7, 8, 9, 10, 11]);
        assert_eq!(deque.segment_count(), 2);
        assert_eq!(tail.segment_count(), 2);

        let empty = deque.split_off(6);
        assert!(empty.is_empty());
        let all = deque.split_off(0);
        assert!(deque.is_empty());
        assert_eq!(deque.segment_count(), 0);
        assert_eq!(all, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn t_split_off_with_allocator() {
        let alloc = CountingAlloc::default();
        let counter = Tracked::counter();
        let mut deque = BatchDeque::<Tracked, 4, _>::new_in(alloc.clone());
        deque.extend((0..10).map(Tracked::new));
        let tail = deque.split_off(4);
        assert_eq!(values(&deque), [0, 1, 2, 3]);
        assert_eq!(values(&tail), [4, 5, 6, 7, 8, 9]);
        drop((deque, tail));
        assert_eq!(counter.live(), 0);
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn t_stable_insert() {
        let mut deque: BatchDeque<i32, 4> = (0..10).collect();
        let prefix: Vec<*const i32> = (0..3).map(|i| &deque[i] as *const i32).collect();
        deque.stable_insert(3, [100, 101, 102, 103, 104]);
        let mut model: Vec<i32> = (0..10).collect();
        model.splice(3..3, [100, 101, 102, 103, 104]);
        assert_eq!(collect(&deque), model);
        for (index, ptr) in prefix.iter().enumerate() {
            assert_eq!(&deque[index] as *const i32, *ptr);
        }
    }

    #[test]
    fn t_stable_insert_splices_whole_segments() {
        let mut deque: BatchDeque<i32, 4> = (0..10).collect();
        let moved_tail = &deque[4] as *const i32;
        deque.stable_insert(3, [100, 101, 102, 103]);
        assert_eq!(deque, [0, 1, 2, 100, 101, 102, 103, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(&deque[8] as *const i32, moved_tail);
        assert_eq!(deque.segment_count(), 4);

        deque.stable_insert(deque.len(), [1]);
        deque.stable_insert(0, []);
        assert_eq!(deque.len(), 15);
        assert_eq!(deque.back(), Some(&1));
    }

    #[test]
    fn t_stable_insert_is_strong() {
        let counter = Tracked::counter();
        let mut deque: BatchDeque<Tracked, 4> = (0..10).map(Tracked::new).collect();
        let result = catch_unwind(AssertUnwindSafe(|| {
            deque.stable_insert(
                3,
                (0..5).map(|v| match v {
                    3 => panic!("iterator failed"),
                    _ => Tracked::new(v),
                }),
            );
        }));
        assert!(result.is_err());
        assert_eq!(values(&deque), (0..10).collect::<Vec<_>>());
        assert_eq!(deque.segment_count(), 3);
        assert_eq!(counter.live(), 10);
    }

    #[test]
    fn t_count_constructor_panic() {
        let alloc = CountingAlloc::default();
        let counter = Tracked::counter();
        counter.panic_on(6);
        let result = catch_unwind(AssertUnwindSafe(|| {
            BatchDeque::<Tracked, 4, _>::from_default_in(10, alloc.clone())
        }));
        assert!(result.is_err());
        assert_eq!(counter.live(), 0);
        assert_eq!(alloc.live(), 0);

        let deque = BatchDeque::<Tracked, 4>::from_default(3);
        assert_eq!(values(&deque), [0, 0, 0]);
        let deque = BatchDeque::<i32, 4>::from_elem(5, 3);
        assert_eq!(deque, [3; 5]);
    }

    #[test]
    fn t_access() {
        let mut deque: BatchDeque<i32, 4> = BatchDeque::from_slice(&[1, 2, 3]);
        assert_eq!(deque.at(1), Ok(&2));
        assert_eq!(
            deque.at(3),
            Err(RangeError::OutOfBounds { index: 3, len: 3 })
        );
        *deque.at_mut(0).unwrap() = 10;
        deque[2] += 1;
        *deque.back_mut().unwrap() *= 2;
        *deque.front_mut().unwrap() += 1;
        assert_eq!(deque, [11, 2, 8]);
        assert_eq!(deque.get(3), None);
    }

    #[test]
    fn t_clone_and_cmp() {
        let mut deque = BatchDeque::<i32, 4>::new();
        for value in 0..6 {
            deque.push_front(value);
        }
        let clone = deque.clone();
        assert_eq!(clone, deque);
        let layout: Vec<usize> = deque.segments().map(<[i32]>::len).collect();
        let cloned_layout: Vec<usize> = clone.segments().map(<[i32]>::len).collect();
        assert_eq!(layout, cloned_layout);

        let smaller: BatchDeque<i32, 4> = [5, 4, 3].into();
        assert!(smaller < deque);
        assert_eq!(format!("{smaller:?}"), "[5, 4, 3]");

        let mut swapped = BatchDeque::new();
        swapped.swap(&mut deque);
        assert!(deque.is_empty());
        assert_eq!(swapped, clone);
    }

    #[test]
    fn t_into_iter() {
        let counter = Tracked::counter();
        let deque: BatchDeque<Tracked, 2> = (0..7).map(Tracked::new).collect();
        let mut iter = deque.into_iter();
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next().map(|t| t.value()), Some(0));
        assert_eq!(iter.next_back().map(|t| t.value()), Some(6));
        assert_eq!(iter.len(), 5);
        drop(iter);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn t_zero_sized() {
        let mut deque = BatchDeque::<(), 4>::new();
        for _ in 0..10 {
            deque.push_back(());
        }
        for _ in 0..5 {
            deque.push_front(());
        }
        assert_eq!(deque.len(), 15);
        assert_eq!(deque.iter().count(), 15);
        deque.insert_n(3, 4, ());
        assert_eq!(deque.len(), 19);
        while deque.pop_front().is_some() {}
        assert_eq!(deque.segment_count(), 0);
    }

    /// Promises more items than it yields and panics on the second one.
    struct Overpromising(i32);

    impl Iterator for Overpromising {
        type Item = i32;

        fn next(&mut self) -> Option<i32> {
            assert!(self.0 < 5, "iterator failed");
            self.0 += 1;
            Some(self.0 - 1)
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            (40, None)
        }
    }

    #[test]
    fn t_extend_panic_releases_segments() {
        let alloc = CountingAlloc::default();
        let mut deque = BatchDeque::<i32, 4, _>::new_in(alloc.clone());
        deque.extend([1, 2, 3]);
        let result = catch_unwind(AssertUnwindSafe(|| deque.extend(Overpromising(4))));
        assert!(result.is_err());
        assert_eq!(deque, [1, 2, 3, 4]);
        assert_eq!(deque.segments().count(), deque.segment_count());
        // the segment and the segment map
        assert_eq!(alloc.live(), 2);

        deque.reserve_back(20);
        let reserved = deque.segment_count();
        deque.extend((5..8).filter(|_| true));
        assert_eq!(deque.segment_count(), reserved);
        drop(deque);
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn t_reserve() {
        let mut deque = BatchDeque::<i32, 4>::from([0, 1, 2]);
        deque.reserve_back(20);
        assert_eq!(deque.segment_count(), 5);
        assert_eq!(deque.segments().count(), 1);
        let first = &deque[0] as *const i32;
        for value in 3..20 {
            deque.push_back(value);
        }
        assert_eq!(deque.segment_count(), 5);

        deque.reserve_front(30);
        assert_eq!(deque.segment_count(), 8);
        for value in 1..=10 {
            deque.push_front(-value);
        }
        assert_eq!(deque.segment_count(), 8);
        assert_eq!(deque.len(), 30);
        assert_eq!(&deque[10] as *const i32, first);

        deque.reserve(25);
        assert_eq!(deque.segment_count(), 8);
        assert!(matches!(
            deque.try_reserve_back(usize::MAX),
            Err(CapacityError::CapacityOverflow { .. })
        ));
        assert!(deque.try_reserve_front(usize::MAX).is_err());
        assert_eq!(deque.segment_count(), 8);

        deque.reserve_back(40);
        assert_eq!(deque.segment_count(), 11);
        deque.shrink_to_fit();
        assert_eq!(deque.segment_count(), 8);
        assert_eq!(deque.segments().count(), deque.segment_count());
        assert_eq!(collect(&deque), (-10..20).collect::<Vec<_>>());
    }

    #[test]
    fn t_reserve_on_empty() {
        let mut deque = BatchDeque::<i32, 4>::new();
        deque.reserve_front(6);
        assert!(deque.is_empty());
        assert_eq!(deque.segment_count(), 2);
        for value in 0..6 {
            deque.push_front(value);
        }
        assert_eq!(deque.segment_count(), 2);
        while deque.pop_back().is_some() {}
        assert_eq!(deque.segment_count(), 0);

        deque.reserve(9);
        assert_eq!(deque.segment_count(), 3);
        deque.extend(0..9);
        assert_eq!(deque.segment_count(), 3);
    }

    #[test]
    fn t_reserved_segments_are_released() {
        let mut deque: BatchDeque<i32, 4> = (0..8).collect();
        deque.reserve_front(16);
        assert_eq!(deque.segment_count(), 4);
        deque.push_front(-1);
        assert_eq!(deque.pop_front(), Some(-1));
        assert_eq!(deque.segment_count(), 2);
        assert_eq!(deque.front(), Some(&0));

        // an insertion keeps the reservation of the other end
        deque.reserve_back(12);
        assert_eq!(deque.segment_count(), 3);
        deque.insert(1, 100);
        assert_eq!(deque.segment_count(), 4);
        for value in 8..12 {
            deque.push_back(value);
        }
        assert_eq!(deque.segment_count(), 4);
        assert_eq!(deque, [0, 100, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);

        let clone = deque.clone();
        assert_eq!(clone, deque);
        assert_eq!(clone.segments().count(), clone.segment_count());

        deque.reserve_back(20);
        let tail = deque.split_off(10);
        assert_eq!(tail, [9, 10, 11]);
        assert_eq!(deque.segments().count(), deque.segment_count());
    }
}
