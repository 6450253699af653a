//! Contiguous double-ended vector.
//!
//! A [`Devector`] keeps its elements in one buffer with free space on both
//! sides, so pushing and popping at either end is amortized `O(1)` and the
//! contents are always available as a slice. Up to `N` elements are stored
//! inline, without touching the allocator.

mod drain;
mod into_iter;
mod policy;
mod storage;

use core::{
    cmp, fmt, hash, iter,
    marker::PhantomData,
    mem,
    ops::{self, Index, IndexMut, RangeBounds},
    ptr::{self, NonNull},
    slice::{self, SliceIndex},
};

use allocator_api2::alloc::{Allocator, Global};
use log::trace;

pub use drain::Drain;
pub use into_iter::IntoIter;
pub use policy::{Aggressive, Balanced, Doubling, GrowthPolicy};
use policy::inline_front_reserve;
use storage::Storage;

use super::{
    guard::{AllocationGuard, ArrayDestroyGuard, NandGuard},
    raw,
};
use crate::{
    error::{CapacityError, RangeError, handle_capacity_error},
    slice::checked_range,
};

/// Double-ended vector with `N` elements of inline storage.
///
/// Live elements occupy the slots `[front, back)` of the buffer. Growth,
/// shrinking and the initial placement inside the inline buffer are decided
/// by the [`GrowthPolicy`] `G`; memory comes from `A`.
pub struct Devector<T, const N: usize = 0, G: GrowthPolicy = Aggressive, A: Allocator = Global> {
    storage: Storage<T, N>,
    front: usize,
    back: usize,
    alloc: A,
    _marker: PhantomData<(T, fn() -> G)>,
}

unsafe impl<T: Send, const N: usize, G: GrowthPolicy, A: Allocator + Send> Send
    for Devector<T, N, G, A>
{
}

unsafe impl<T: Sync, const N: usize, G: GrowthPolicy, A: Allocator + Sync> Sync
    for Devector<T, N, G, A>
{
}

impl<T, const N: usize, G: GrowthPolicy> Devector<T, N, G> {
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Creates a devector of `count` default values.
    pub fn from_default(count: usize) -> Self
    where
        T: Default,
    {
        Self::from_default_in(count, Global)
    }

    /// Creates a devector of `count` clones of `value`.
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

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Devector<T, N, G, A> {
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        let front = inline_front_reserve::<G>(N);
        Self {
            storage: Storage::inline(),
            front,
            back: front,
            alloc,
            _marker: PhantomData,
        }
    }

    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, CapacityError> {
        if capacity <= N {
            let mut dev = Self::new_in(alloc);
            dev.front = dev.front.min(N - capacity);
            dev.back = dev.front;
            return Ok(dev);
        }
        let ptr = raw::allocate_array::<T, A>(&alloc, capacity)?;
        Ok(Self {
            storage: Storage::Heap { ptr, capacity },
            front: 0,
            back: 0,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Creates an empty devector that can take `capacity` elements at the back
    /// without reallocating.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).unwrap_or_else(|err| handle_capacity_error(err))
    }

    pub fn from_default_in(count: usize, alloc: A) -> Self
    where
        T: Default,
    {
        let mut dev = Self::with_capacity_in(count, alloc);
        for _ in 0..count {
            unsafe { dev.unsafe_push_back(T::default()) };
        }
        dev
    }

    pub fn from_elem_in(count: usize, value: T, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut dev = Self::with_capacity_in(count, alloc);
        for value in iter::repeat_n(value, count) {
            unsafe { dev.unsafe_push_back(value) };
        }
        dev
    }

    pub fn from_slice_in(values: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        let mut dev = Self::with_capacity_in(values.len(), alloc);
        for value in values {
            unsafe { dev.unsafe_push_back(value.clone()) };
        }
        dev
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.back - self.front
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.front == self.back
    }

    #[inline]
    pub const fn max_size(&self) -> usize {
        raw::max_size::<T>()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Whether the elements currently live in the inline buffer.
    #[inline]
    pub const fn is_inline(&self) -> bool {
        self.storage.is_inline()
    }

    /// Number of `push_front` calls that succeed without moving anything.
    #[inline]
    pub const fn front_free_capacity(&self) -> usize {
        self.front
    }

    /// Number of `push_back` calls that succeed without moving anything.
    #[inline]
    pub const fn back_free_capacity(&self) -> usize {
        self.capacity() - self.back
    }

    /// Pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        unsafe { self.storage.as_ptr().add(self.front) }
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        unsafe { self.storage.as_mut_ptr().add(self.front) }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
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
        self.first()
    }

    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.first_mut()
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.last()
    }

    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.last_mut()
    }

    /// Makes sure `new_capacity - len()` elements can be pushed at the back
    /// without reallocating. The front free space is kept.
    pub fn try_reserve_back(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        let additional = new_capacity.saturating_sub(self.len());
        if self.back_free_capacity() >= additional {
            return Ok(());
        }
        let max_size = raw::max_size::<T>();
        let capacity = self
            .front
            .checked_add(new_capacity)
            .filter(|&capacity| capacity <= max_size)
            .ok_or(CapacityError::CapacityOverflow {
                requested: new_capacity,
                max_size,
            })?;
        self.relocate(capacity, self.front)
    }

    /// Makes sure `new_capacity - len()` elements can be pushed at the front
    /// without reallocating. The back free space is kept.
    pub fn try_reserve_front(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        let additional = new_capacity.saturating_sub(self.len());
        if self.front >= additional {
            return Ok(());
        }
        let max_size = raw::max_size::<T>();
        let capacity = self
            .back_free_capacity()
            .checked_add(new_capacity)
            .filter(|&capacity| capacity <= max_size)
            .ok_or(CapacityError::CapacityOverflow {
                requested: new_capacity,
                max_size,
            })?;
        self.relocate(capacity, additional)
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

    /// Gives unused memory back, as far as the growth policy allows. Moves the
    /// elements into the inline buffer when they fit.
    pub fn shrink_to_fit(&mut self) {
        let len = self.len();
        let capacity = self.capacity();
        if self.storage.is_inline() || !G::should_shrink(len, capacity, N) {
            return;
        }
        let result = if len <= N {
            self.relocate(N, inline_front_reserve::<G>(N).min(N - len))
        } else {
            self.relocate(len, 0)
        };
        match result {
            Ok(()) => trace!("devector shrunk: capacity {capacity} -> {}", self.capacity()),
            Err(err) => handle_capacity_error(err),
        }
    }

    #[inline]
    pub fn push_back(&mut self, value: T) {
        if self.back == self.capacity() {
            if let Err(err) = self.grow_back(1) {
                handle_capacity_error(err)
            }
        }
        unsafe { self.unsafe_push_back(value) }
    }

    #[inline]
    pub fn push_front(&mut self, value: T) {
        if self.front == 0 {
            if let Err(err) = self.grow_front(1) {
                handle_capacity_error(err)
            }
        }
        unsafe { self.unsafe_push_front(value) }
    }

    /// # Safety
    ///
    /// [`back_free_capacity`](Self::back_free_capacity) must be non-zero.
    #[inline]
    pub unsafe fn unsafe_push_back(&mut self, value: T) {
        debug_assert!(self.back < self.capacity());
        unsafe { self.storage.as_mut_ptr().add(self.back).write(value) };
        self.back += 1;
    }

    /// # Safety
    ///
    /// [`front_free_capacity`](Self::front_free_capacity) must be non-zero.
    #[inline]
    pub unsafe fn unsafe_push_front(&mut self, value: T) {
        debug_assert!(self.front > 0);
        self.front -= 1;
        unsafe { self.storage.as_mut_ptr().add(self.front).write(value) };
    }

    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.back -= 1;
        Some(unsafe { self.storage.as_ptr().add(self.back).read() })
    }

    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = unsafe { self.storage.as_ptr().add(self.front).read() };
        self.front += 1;
        Some(value)
    }

    /// Inserts `value` before the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.insert_exact(index, 1, iter::once(value));
    }

    /// Inserts `count` clones of `value` before the element at `index`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: T)
    where
        T: Clone,
    {
        self.insert_exact(index, count, iter::repeat_n(value, count));
    }

    pub fn insert_slice(&mut self, index: usize, values: &[T])
    where
        T: Clone,
    {
        self.insert_exact(index, values.len(), values.iter().cloned());
    }

    /// Inserts the items of `iter` before the element at `index`.
    ///
    /// Iterators that know their exact length fill the gap directly, others
    /// are collected first. Either way the devector is left unchanged if the
    /// iterator panics.
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

    /// Removes and returns the element at `index`, closing the hole from the
    /// shorter side.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let len = self.len();
        if index >= len {
            return None;
        }
        let buf = self.storage.as_mut_ptr();
        unsafe {
            let slot = buf.add(self.front + index);
            let value = slot.read();
            if index < len - index - 1 {
                ptr::copy(buf.add(self.front), buf.add(self.front + 1), index);
                self.front += 1;
            } else {
                ptr::copy(slot.add(1), slot, len - index - 1);
                self.back -= 1;
            }
            Some(value)
        }
    }

    /// Removes the elements in `range` and yields them.
    ///
    /// When the iterator is dropped the remaining elements of the range are
    /// dropped and the gap is closed by moving the shorter side.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn drain<R>(&mut self, range: R) -> Drain<'_, T, N, G, A>
    where
        R: RangeBounds<usize>,
    {
        let len = self.len();
        let ops::Range { start, end } = checked_range(range, len);
        unsafe {
            // the tail is forgotten until the Drain is dropped
            self.back = self.front + start;
            let range_slice =
                slice::from_raw_parts(self.storage.as_ptr().add(self.front + start), end - start);
            Drain {
                prefix_len: start,
                tail_start: end,
                tail_len: len - end,
                iter: range_slice.iter(),
                dev: NonNull::from(self),
            }
        }
    }

    /// Drops the elements in `range`.
    pub fn erase<R>(&mut self, range: R)
    where
        R: RangeBounds<usize>,
    {
        drop(self.drain(range));
    }

    /// Keeps the first `len` elements.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        let tail = unsafe {
            ptr::slice_from_raw_parts_mut(self.storage.as_mut_ptr().add(self.front + len), old_len - len)
        };
        self.back = self.front + len;
        unsafe { ptr::drop_in_place(tail) };
    }

    /// Keeps the last `len` elements.
    pub fn truncate_front(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        let head = ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), old_len - len);
        self.front = self.back - len;
        unsafe { ptr::drop_in_place(head) };
    }

    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        let len = self.len();
        if new_len > len {
            let count = new_len - len;
            self.insert_exact(len, count, iter::repeat_n(value, count));
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
            self.insert_exact(len, new_len - len, iter::repeat_with(f));
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
        if new_len > len {
            let count = new_len - len;
            self.insert_exact(0, count, iter::repeat_n(value, count));
        } else {
            self.truncate_front(new_len);
        }
    }

    pub fn resize_front_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        let len = self.len();
        if new_len > len {
            self.insert_exact(0, new_len - len, iter::repeat_with(f));
        } else {
            self.truncate_front(new_len);
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
            self.extend_back(iter);
        }
    }

    /// Replaces the contents with clones of `values`.
    ///
    /// Without reallocation the live elements are overwritten with
    /// `clone_from`. With reallocation the devector is unchanged if a clone
    /// panics.
    pub fn assign_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        if values.len() > self.capacity() {
            return self.assign_slice_realloc(values);
        }
        let len = self.len();
        if values.len() <= len {
            self.truncate(values.len());
            self.as_mut_slice().clone_from_slice(values);
        } else {
            let (head, tail) = values.split_at(len);
            self.as_mut_slice().clone_from_slice(head);
            self.fit_back(tail.len());
            for value in tail {
                unsafe { self.unsafe_push_back(value.clone()) };
            }
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
        let front = if self.storage.is_inline() { inline_front_reserve::<G>(N) } else { 0 };
        self.front = front;
        self.back = front;
    }

    /// Exchanges the contents of two devectors, allocators included.
    ///
    /// Two heap buffers are exchanged by pointer; inline elements are moved.
    pub fn swap(&mut self, other: &mut Self) {
        match (&mut self.storage, &mut other.storage) {
            (
                Storage::Heap { ptr, capacity },
                Storage::Heap {
                    ptr: other_ptr,
                    capacity: other_capacity,
                },
            ) => {
                mem::swap(ptr, other_ptr);
                mem::swap(capacity, other_capacity);
            }
            (storage, other_storage) => mem::swap(storage, other_storage),
        }
        mem::swap(&mut self.front, &mut other.front);
        mem::swap(&mut self.back, &mut other.back);
        mem::swap(&mut self.alloc, &mut other.alloc);
    }

    /// Makes room for `additional` elements at the back, moving the elements
    /// inside the buffer or reallocating it.
    #[inline]
    pub(crate) fn try_grow_back(&mut self, additional: usize) -> Result<(), CapacityError> {
        if self.back_free_capacity() >= additional {
            Ok(())
        } else {
            self.grow_back(additional)
        }
    }

    #[inline]
    pub(crate) fn try_grow_front(&mut self, additional: usize) -> Result<(), CapacityError> {
        if self.front >= additional {
            Ok(())
        } else {
            self.grow_front(additional)
        }
    }

    fn required_len(&self, additional: usize) -> Result<usize, CapacityError> {
        let max_size = raw::max_size::<T>();
        self.len()
            .checked_add(additional)
            .filter(|&required| required <= max_size)
            .ok_or(CapacityError::CapacityOverflow {
                requested: self.len().saturating_add(additional),
                max_size,
            })
    }

    /// Whether `required` elements should be shuffled inside the current
    /// buffer instead of getting a new one.
    fn fits_in_place(&self, required: usize) -> bool {
        let capacity = self.capacity();
        required <= capacity
            && (required <= capacity / 2 || self.storage.is_inline() || self.is_empty())
    }

    fn grown_capacity(&self, required: usize) -> usize {
        G::new_capacity(self.capacity(), required)
            .max(required)
            .max(N.saturating_add(1))
            .min(raw::max_size::<T>())
    }

    #[cold]
    fn grow_back(&mut self, additional: usize) -> Result<(), CapacityError> {
        let required = self.required_len(additional)?;
        let capacity = self.capacity();
        if self.fits_in_place(required) {
            let new_front = (capacity - required) / 2;
            trace!("devector recentred: front {} -> {new_front}", self.front);
            unsafe { self.shift_to(new_front) };
            return Ok(());
        }
        let new_capacity = self.grown_capacity(required);
        self.relocate(new_capacity, self.front.min(new_capacity - required))
    }

    #[cold]
    fn grow_front(&mut self, additional: usize) -> Result<(), CapacityError> {
        let required = self.required_len(additional)?;
        let capacity = self.capacity();
        let len = self.len();
        if self.fits_in_place(required) {
            let new_front = capacity - len - (capacity - required) / 2;
            trace!("devector recentred: front {} -> {new_front}", self.front);
            unsafe { self.shift_to(new_front) };
            return Ok(());
        }
        let new_capacity = self.grown_capacity(required);
        let back_free = self.back_free_capacity().min(new_capacity - required);
        self.relocate(new_capacity, new_capacity - len - back_free)
    }

    /// Makes room for `additional` elements at the back, preferring to move
    /// the elements whenever the buffer is large enough.
    fn fit_back(&mut self, additional: usize) {
        if self.back_free_capacity() >= additional {
            return;
        }
        let capacity = self.capacity();
        match self.len().checked_add(additional) {
            Some(required) if required <= capacity => {
                let new_front = (capacity - required) / 2;
                trace!("devector recentred: front {} -> {new_front}", self.front);
                unsafe { self.shift_to(new_front) };
            }
            _ => {
                if let Err(err) = self.grow_back(additional) {
                    handle_capacity_error(err)
                }
            }
        }
    }

    fn extend_back<I>(&mut self, iter: I)
    where
        I: Iterator<Item = T>,
    {
        let (lower, _) = iter.size_hint();
        self.fit_back(lower);
        for value in iter {
            self.push_back(value);
        }
    }

    /// # Safety
    ///
    /// `new_front + len()` must not exceed the capacity.
    unsafe fn shift_to(&mut self, new_front: usize) {
        let len = self.len();
        let buf = self.storage.as_mut_ptr();
        unsafe { ptr::copy(buf.add(self.front), buf.add(new_front), len) };
        self.front = new_front;
        self.back = new_front + len;
    }

    /// Moves the elements into a buffer of `new_capacity`, first one at
    /// `new_front`. Capacities up to `N` select the inline buffer.
    fn relocate(&mut self, new_capacity: usize, new_front: usize) -> Result<(), CapacityError> {
        let len = self.len();
        let mut new_storage = if new_capacity <= N {
            Storage::inline()
        } else {
            Storage::Heap {
                ptr: raw::allocate_array::<T, A>(&self.alloc, new_capacity)?,
                capacity: new_capacity,
            }
        };
        debug_assert!(new_front + len <= new_storage.capacity());
        unsafe {
            ptr::copy_nonoverlapping(
                self.storage.as_ptr().add(self.front),
                new_storage.as_mut_ptr().add(new_front),
                len,
            )
        };
        let old = mem::replace(&mut self.storage, new_storage);
        trace!(
            "devector relocated: capacity {} -> {}, front {} -> {new_front}",
            old.capacity(),
            self.capacity(),
            self.front,
        );
        self.release_storage(old);
        self.front = new_front;
        self.back = new_front + len;
        Ok(())
    }

    fn release_storage(&self, storage: Storage<T, N>) {
        if let Storage::Heap { ptr, capacity } = storage {
            unsafe { raw::deallocate_array(&self.alloc, ptr, capacity) };
        }
    }

    /// Opens a `count` slot gap before `index` and fills it from `iter`.
    ///
    /// Returns how many items were written, less than `count` only if `iter`
    /// ran out early. A panicking `iter` leaves the devector unchanged.
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
        let front_free = self.front;
        let back_free = self.back_free_capacity();
        let suffix = len - index;
        let (front_shift, back_shift) =
            if front_free >= count && (back_free < count || index <= suffix) {
                (count, 0)
            } else if back_free >= count {
                (0, count)
            } else if front_free.saturating_add(back_free) >= count {
                (front_free, count - front_free)
            } else {
                return self.insert_realloc(index, count, iter);
            };
        self.insert_in_place(index, count, front_shift, back_shift, iter)
    }

    fn insert_in_place<I>(
        &mut self,
        index: usize,
        count: usize,
        front_shift: usize,
        back_shift: usize,
        iter: I,
    ) -> usize
    where
        I: Iterator<Item = T>,
    {
        let orig_front = self.front;
        let suffix = self.len() - index;
        let buf = self.storage.as_mut_ptr();
        unsafe {
            ptr::copy(buf.add(orig_front), buf.add(orig_front - front_shift), index);
            ptr::copy(
                buf.add(orig_front + index),
                buf.add(orig_front + index + back_shift),
                suffix,
            );
        }
        // nothing is live until the gap guard settles the indices
        self.back = self.front;

        let mut gap = GapGuard {
            dev: self,
            orig_front,
            index,
            suffix,
            front_shift,
            count,
            filled: 0,
        };
        let gap_start = gap.gap_start();
        for value in iter.take(count) {
            unsafe {
                let slot = gap.dev.storage.as_mut_ptr().add(gap_start + gap.filled);
                slot.write(value);
            }
            gap.filled += 1;
        }
        gap.commit()
    }

    #[cold]
    fn insert_realloc<I>(&mut self, index: usize, count: usize, iter: I) -> usize
    where
        I: Iterator<Item = T>,
    {
        let len = self.len();
        let required = self
            .required_len(count)
            .unwrap_or_else(|err| handle_capacity_error(err));
        let new_capacity = self.grown_capacity(required);
        let slack = new_capacity - required;
        // the side that is growing gets the slack, the other keeps its free space
        let new_front = if index <= len / 2 {
            slack - self.back_free_capacity().min(slack)
        } else {
            self.front.min(slack)
        };
        let new_ptr = raw::allocate_array::<T, A>(&self.alloc, new_capacity)
            .unwrap_or_else(|err| handle_capacity_error(err));
        let allocation = unsafe { AllocationGuard::new(new_ptr, new_capacity, &self.alloc) };

        let gap_start = new_front + index;
        let mut built = unsafe { ArrayDestroyGuard::new(allocation.as_ptr().add(gap_start), 0) };
        for value in iter.take(count) {
            unsafe { allocation.as_ptr().add(gap_start + built.len()).write(value) };
            built.increment_size(1);
        }
        let filled = built.len();
        built.release();

        let old = self.storage.as_ptr();
        unsafe {
            ptr::copy_nonoverlapping(old.add(self.front), allocation.as_ptr().add(new_front), index);
            ptr::copy_nonoverlapping(
                old.add(self.front + index),
                allocation.as_ptr().add(gap_start + filled),
                len - index,
            );
        }
        let ptr = allocation.release();
        let old = mem::replace(
            &mut self.storage,
            Storage::Heap {
                ptr,
                capacity: new_capacity,
            },
        );
        trace!(
            "devector reallocated for insert: capacity {} -> {new_capacity}, front {new_front}",
            old.capacity()
        );
        self.release_storage(old);
        self.front = new_front;
        self.back = new_front + len + filled;
        filled
    }

    #[cold]
    fn assign_slice_realloc(&mut self, values: &[T])
    where
        T: Clone,
    {
        let capacity = values.len();
        let len = self.len();
        let old = self.as_mut_ptr();
        let ptr = raw::allocate_array::<T, A>(&self.alloc, capacity)
            .unwrap_or_else(|err| handle_capacity_error(err));
        let allocation = unsafe { AllocationGuard::new(ptr, capacity, &self.alloc) };

        let mut clones = unsafe { NandGuard::new(old, len, allocation.as_ptr(), 0) };
        for (i, value) in values.iter().enumerate() {
            unsafe { allocation.as_ptr().add(i).write(value.clone()) };
            clones.destination_mut().increment_size(1);
        }
        clones.release();
        let ptr = allocation.release();

        // the old elements belong to the guard now
        self.back = self.front;
        drop(clones);
        let old = mem::replace(&mut self.storage, Storage::Heap { ptr, capacity });
        trace!(
            "devector reallocated for assign: capacity {} -> {capacity}",
            old.capacity()
        );
        self.release_storage(old);
        self.front = 0;
        self.back = capacity;
    }
}

/// Gap opened by an insertion.
///
/// Dropping it without [`commit`](Self::commit) destroys what was written into
/// the gap and moves every element back where it was.
struct GapGuard<'a, T, const N: usize, G: GrowthPolicy, A: Allocator> {
    dev: &'a mut Devector<T, N, G, A>,
    orig_front: usize,
    index: usize,
    suffix: usize,
    front_shift: usize,
    count: usize,
    filled: usize,
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> GapGuard<'_, T, N, G, A> {
    #[inline]
    fn gap_start(&self) -> usize {
        self.orig_front - self.front_shift + self.index
    }

    /// Closes the unfilled part of the gap and returns the number of
    /// inserted elements.
    fn commit(self) -> usize {
        let gap_start = self.gap_start();
        let filled = self.filled;
        let buf = self.dev.storage.as_mut_ptr();
        if filled < self.count {
            unsafe {
                ptr::copy(
                    buf.add(gap_start + self.count),
                    buf.add(gap_start + filled),
                    self.suffix,
                )
            };
        }
        self.dev.front = self.orig_front - self.front_shift;
        self.dev.back = gap_start + filled + self.suffix;
        mem::forget(self);
        filled
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Drop for GapGuard<'_, T, N, G, A> {
    fn drop(&mut self) {
        let gap_start = self.gap_start();
        let buf = self.dev.storage.as_mut_ptr();
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(buf.add(gap_start), self.filled));
            ptr::copy(
                buf.add(gap_start + self.count),
                buf.add(self.orig_front + self.index),
                self.suffix,
            );
            ptr::copy(
                buf.add(self.orig_front - self.front_shift),
                buf.add(self.orig_front),
                self.index,
            );
        }
        self.dev.front = self.orig_front;
        self.dev.back = self.orig_front + self.index + self.suffix;
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Drop for Devector<T, N, G, A> {
    fn drop(&mut self) {
        let live = ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), self.len());
        unsafe { ptr::drop_in_place(live) };
        if let Storage::Heap { ptr, capacity } = self.storage {
            unsafe { raw::deallocate_array(&self.alloc, ptr, capacity) };
        }
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator + Default> Default for Devector<T, N, G, A> {
    #[inline]
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, const N: usize, G: GrowthPolicy, A: Allocator + Clone> Clone
    for Devector<T, N, G, A>
{
    fn clone(&self) -> Self {
        Self::from_slice_in(self, self.alloc.clone())
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign_slice(source);
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> ops::Deref for Devector<T, N, G, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> ops::DerefMut for Devector<T, N, G, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> AsRef<[T]> for Devector<T, N, G, A> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> AsMut<[T]> for Devector<T, N, G, A> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, I: SliceIndex<[T]>, const N: usize, G: GrowthPolicy, A: Allocator> Index<I>
    for Devector<T, N, G, A>
{
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        Index::index(&**self, index)
    }
}

impl<T, I: SliceIndex<[T]>, const N: usize, G: GrowthPolicy, A: Allocator> IndexMut<I>
    for Devector<T, N, G, A>
{
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(&mut **self, index)
    }
}

impl<T, U, const N1: usize, const N2: usize, G1, G2, A1, A2> PartialEq<Devector<U, N2, G2, A2>>
    for Devector<T, N1, G1, A1>
where
    T: PartialEq<U>,
    G1: GrowthPolicy,
    G2: GrowthPolicy,
    A1: Allocator,
    A2: Allocator,
{
    #[inline]
    fn eq(&self, other: &Devector<U, N2, G2, A2>) -> bool {
        PartialEq::eq(&**self, &**other)
    }
}

impl<T, U, const N: usize, G: GrowthPolicy, A: Allocator> PartialEq<[U]> for Devector<T, N, G, A>
where
    T: PartialEq<U>,
{
    #[inline]
    fn eq(&self, other: &[U]) -> bool {
        PartialEq::eq(&**self, other)
    }
}

impl<T, U, const N: usize, const M: usize, G: GrowthPolicy, A: Allocator> PartialEq<[U; M]>
    for Devector<T, N, G, A>
where
    T: PartialEq<U>,
{
    #[inline]
    fn eq(&self, other: &[U; M]) -> bool {
        PartialEq::eq(&**self, other)
    }
}

impl<T: Eq, const N: usize, G: GrowthPolicy, A: Allocator> Eq for Devector<T, N, G, A> {}

impl<T: PartialOrd, const N: usize, G: GrowthPolicy, A: Allocator> PartialOrd
    for Devector<T, N, G, A>
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        PartialOrd::partial_cmp(&**self, &**other)
    }
}

impl<T: Ord, const N: usize, G: GrowthPolicy, A: Allocator> Ord for Devector<T, N, G, A> {
    #[inline]
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Ord::cmp(&**self, &**other)
    }
}

impl<T: hash::Hash, const N: usize, G: GrowthPolicy, A: Allocator> hash::Hash
    for Devector<T, N, G, A>
{
    #[inline]
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        hash::Hash::hash(&**self, state);
    }
}

impl<T: fmt::Debug, const N: usize, G: GrowthPolicy, A: Allocator> fmt::Debug
    for Devector<T, N, G, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> Extend<T> for Devector<T, N, G, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.extend_back(iter.into_iter());
    }
}

impl<'a, T: Copy + 'a, const N: usize, G: GrowthPolicy, A: Allocator> Extend<&'a T>
    for Devector<T, N, G, A>
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend_back(iter.into_iter().copied());
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator + Default> FromIterator<T>
    for Devector<T, N, G, A>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut dev = match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Self::with_capacity_in(lower, A::default()),
            _ => Self::new_in(A::default()),
        };
        dev.extend_back(iter);
        dev
    }
}

impl<T, const N: usize, const M: usize, G: GrowthPolicy, A: Allocator + Default> From<[T; M]>
    for Devector<T, N, G, A>
{
    fn from(value: [T; M]) -> Self {
        Self::from_iter(value)
    }
}

impl<T, const N: usize, G: GrowthPolicy, A: Allocator> IntoIterator for Devector<T, N, G, A> {
    type Item = T;
    type IntoIter = IntoIter<T, N, G, A>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, const N: usize, G: GrowthPolicy, A: Allocator> IntoIterator
    for &'a Devector<T, N, G, A>
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, G: GrowthPolicy, A: Allocator> IntoIterator
    for &'a mut Devector<T, N, G, A>
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
