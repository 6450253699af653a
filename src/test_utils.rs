//! Instrumented element and allocator types for exception-safety tests.

use core::{alloc::Layout, ptr::NonNull};
use std::{cell::Cell, rc::Rc};

use allocator_api2::alloc::{AllocError, Allocator, Global};

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
    /// Remaining `Clone`/`Default` calls before one panics, `0` when disarmed.
    static COUNTDOWN: Cell<usize> = const { Cell::new(0) };
}

/// Handle on the current thread's [`Tracked`] bookkeeping.
///
/// Creating one resets the counters; dropping it disarms pending panics.
pub(crate) struct Counter(());

impl Counter {
    pub(crate) fn live(&self) -> isize {
        LIVE.with(Cell::get)
    }

    /// Makes the `nth` (1-based) upcoming `Clone` or `Default` panic.
    pub(crate) fn panic_on(&self, nth: usize) {
        COUNTDOWN.with(|c| c.set(nth));
    }

    pub(crate) fn disarm(&self) {
        COUNTDOWN.with(|c| c.set(0));
    }
}

impl Drop for Counter {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Tracked(i32);

impl Tracked {
    pub(crate) fn counter() -> Counter {
        LIVE.with(|l| l.set(0));
        COUNTDOWN.with(|c| c.set(0));
        Counter(())
    }

    pub(crate) fn new(value: i32) -> Self {
        LIVE.with(|l| l.set(l.get() + 1));
        Self(value)
    }

    pub(crate) fn value(&self) -> i32 {
        self.0
    }

    fn tick() {
        let fire = COUNTDOWN.with(|c| match c.get() {
            0 => false,
            1 => {
                c.set(0);
                true
            }
            n => {
                c.set(n - 1);
                false
            }
        });
        if fire {
            panic!("injected panic");
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Self::tick();
        Self::new(self.0)
    }
}

impl Default for Tracked {
    fn default() -> Self {
        Self::tick();
        Self::new(0)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        LIVE.with(|l| l.set(l.get() - 1));
    }
}

pub(crate) fn values<'a>(items: impl IntoIterator<Item = &'a Tracked>) -> Vec<i32> {
    items.into_iter().map(Tracked::value).collect()
}

/// Allocator counting the blocks it handed out and did not get back yet.
#[derive(Clone, Default, Debug)]
pub(crate) struct CountingAlloc(Rc<Cell<usize>>);

impl CountingAlloc {
    pub(crate) fn live(&self) -> usize {
        self.0.get()
    }
}

unsafe impl Allocator for CountingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let block = Global.allocate(layout)?;
        self.0.set(self.0.get() + 1);
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.0.set(self.0.get() - 1);
        unsafe { Global.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn t_counter() {
        let counter = Tracked::counter();
        let a = Tracked::new(1);
        let b = a.clone();
        assert_eq!(counter.live(), 2);
        drop((a, b));
        assert_eq!(counter.live(), 0);

        counter.panic_on(2);
        let a = Tracked::default();
        assert!(catch_unwind(AssertUnwindSafe(|| a.clone())).is_err());
        let _b = a.clone();
        assert_eq!(counter.live(), 2);
    }

    #[test]
    fn t_counting_alloc() {
        let alloc = CountingAlloc::default();
        let layout = Layout::new::<u64>();
        let block = alloc.allocate(layout).unwrap();
        assert_eq!(alloc.clone().live(), 1);
        unsafe { alloc.deallocate(block.cast(), layout) };
        assert_eq!(alloc.live(), 0);
    }
}
