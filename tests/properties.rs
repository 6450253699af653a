use std::collections::VecDeque;

use bideque::collections::{
    BatchDeque, Devector,
    devector::{Balanced, Doubling},
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    PushBack(i32),
    PushFront(i32),
    PopBack,
    PopFront,
    Insert(usize, i32),
    InsertN(usize, usize, i32),
    Remove(usize),
    Erase(usize, usize),
    Truncate(usize),
    TruncateFront(usize),
    Resize(usize, i32),
    Clear,
}

impl Op {
    /// Brings indices into range for a sequence of `len` elements.
    fn fit(self, len: usize) -> Self {
        match self {
            Op::Insert(index, value) => Op::Insert(index % (len + 1), value),
            Op::InsertN(index, count, value) => Op::InsertN(index % (len + 1), count, value),
            Op::Remove(index) => Op::Remove(index % (len + 1)),
            Op::Erase(a, b) => {
                let (a, b) = (a % (len + 1), b % (len + 1));
                Op::Erase(a.min(b), a.max(b))
            }
            op => op,
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i32>().prop_map(Op::PushBack),
        4 => any::<i32>().prop_map(Op::PushFront),
        2 => Just(Op::PopBack),
        2 => Just(Op::PopFront),
        2 => (any::<usize>(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
        1 => (any::<usize>(), 0usize..12, any::<i32>()).prop_map(|(i, n, v)| Op::InsertN(i, n, v)),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Erase(a, b)),
        1 => (0usize..40).prop_map(Op::Truncate),
        1 => (0usize..40).prop_map(Op::TruncateFront),
        1 => (0usize..40, any::<i32>()).prop_map(|(n, v)| Op::Resize(n, v)),
        1 => Just(Op::Clear),
    ]
}

trait Sequence {
    fn apply(&mut self, op: &Op) -> Option<i32>;

    fn contents(&self) -> Vec<i32>;
}

impl Sequence for VecDeque<i32> {
    fn apply(&mut self, op: &Op) -> Option<i32> {
        match *op {
            Op::PushBack(value) => self.push_back(value),
            Op::PushFront(value) => self.push_front(value),
            Op::PopBack => return self.pop_back(),
            Op::PopFront => return self.pop_front(),
            Op::Insert(index, value) => self.insert(index, value),
            Op::InsertN(index, count, value) => {
                for _ in 0..count {
                    self.insert(index, value);
                }
            }
            Op::Remove(index) => return self.remove(index),
            Op::Erase(a, b) => {
                self.drain(a..b);
            }
            Op::Truncate(len) => self.truncate(len),
            Op::TruncateFront(len) => {
                let excess = self.len().saturating_sub(len);
                self.drain(..excess);
            }
            Op::Resize(len, value) => self.resize(len, value),
            Op::Clear => self.clear(),
        }
        None
    }

    fn contents(&self) -> Vec<i32> {
        self.iter().copied().collect()
    }
}

macro_rules! sequence {
    ($($ty:ty),*) => {$(
        impl Sequence for $ty {
            fn apply(&mut self, op: &Op) -> Option<i32> {
                match *op {
                    Op::PushBack(value) => self.push_back(value),
                    Op::PushFront(value) => self.push_front(value),
                    Op::PopBack => return self.pop_back(),
                    Op::PopFront => return self.pop_front(),
                    Op::Insert(index, value) => self.insert(index, value),
                    Op::InsertN(index, count, value) => self.insert_n(index, count, value),
                    Op::Remove(index) => return self.remove(index),
                    Op::Erase(a, b) => self.erase(a..b),
                    Op::Truncate(len) => self.truncate(len),
                    Op::TruncateFront(len) => self.truncate_front(len),
                    Op::Resize(len, value) => self.resize(len, value),
                    Op::Clear => self.clear(),
                }
                None
            }

            fn contents(&self) -> Vec<i32> {
                self.iter().copied().collect()
            }
        }
    )*};
}

sequence!(
    Devector<i32>,
    Devector<i32, 4, Balanced>,
    Devector<i32, 8, Doubling>,
    BatchDeque<i32, 4>,
    BatchDeque<i32, 1>
);

fn check_against_model<C: Sequence>(mut container: C, ops: Vec<Op>, check: impl Fn(&C)) {
    let mut model = VecDeque::new();
    for op in ops {
        let op = op.fit(model.len());
        assert_eq!(container.apply(&op), model.apply(&op), "{op:?}");
        assert_eq!(container.contents(), model.contents(), "{op:?}");
        check(&container);
    }
}

fn check_devector<const N: usize, G: bideque::collections::devector::GrowthPolicy>(
    dev: &Devector<i32, N, G>,
) {
    assert!(dev.len() <= dev.capacity());
    assert_eq!(
        dev.front_free_capacity() + dev.len() + dev.back_free_capacity(),
        dev.capacity()
    );
    assert_eq!(dev.is_inline(), dev.capacity() == N);
}

fn check_batch_deque<const S: usize>(deque: &BatchDeque<i32, S>) {
    let used: Vec<usize> = deque.segments().map(<[i32]>::len).collect();
    assert_eq!(used.iter().sum::<usize>(), deque.len());
    assert_eq!(used.len(), deque.segment_count());
    assert!(used.iter().all(|&len| len > 0 && len <= S));
    if used.len() > 2 {
        assert!(used[1..used.len() - 1].iter().all(|&len| len == S));
    }
}

fn deque_from<const S: usize>(front: &[i32], back: &[i32]) -> BatchDeque<i32, S> {
    let mut deque = BatchDeque::new();
    for &value in back {
        deque.push_back(value);
    }
    for &value in front {
        deque.push_front(value);
    }
    deque
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn devector_matches_model(ops in prop::collection::vec(op(), 0..200)) {
        check_against_model(Devector::<i32>::new(), ops, check_devector);
    }

    #[test]
    fn inline_devector_matches_model(ops in prop::collection::vec(op(), 0..200)) {
        check_against_model(Devector::<i32, 4, Balanced>::new(), ops.clone(), check_devector);
        check_against_model(Devector::<i32, 8, Doubling>::new(), ops, check_devector);
    }

    #[test]
    fn batch_deque_matches_model(ops in prop::collection::vec(op(), 0..200)) {
        check_against_model(BatchDeque::<i32, 4>::new(), ops.clone(), check_batch_deque);
        check_against_model(BatchDeque::<i32, 1>::new(), ops, check_batch_deque);
    }

    #[test]
    fn push_then_pop_is_identity(
        values in prop::collection::vec(any::<i32>(), 0..50),
        value in any::<i32>(),
    ) {
        let mut dev: Devector<i32, 4> = values.iter().copied().collect();
        dev.push_back(value);
        prop_assert_eq!(dev.pop_back(), Some(value));
        dev.push_front(value);
        prop_assert_eq!(dev.pop_front(), Some(value));
        prop_assert_eq!(dev.as_slice(), &values[..]);

        let mut deque: BatchDeque<i32, 4> = values.iter().copied().collect();
        deque.push_front(value);
        prop_assert_eq!(deque.pop_front(), Some(value));
        deque.push_back(value);
        prop_assert_eq!(deque.pop_back(), Some(value));
        prop_assert_eq!(deque.iter().copied().collect::<Vec<_>>(), values);
    }

    #[test]
    fn reserve_avoids_reallocation(
        values in prop::collection::vec(any::<i32>(), 1..50),
        extra in 0usize..50,
    ) {
        let mut dev: Devector<i32> = values.iter().copied().collect();
        dev.reserve_back(dev.len() + extra);
        let first = dev.as_ptr();
        for value in 0..extra as i32 {
            dev.push_back(value);
        }
        prop_assert_eq!(dev.as_ptr(), first);

        dev.reserve_front(dev.len() + extra);
        let last = dev.back().map(|last| last as *const i32);
        for value in 0..extra as i32 {
            dev.push_front(value);
        }
        prop_assert_eq!(dev.back().map(|last| last as *const i32), last);

        let mut deque: BatchDeque<i32, 4> = values.iter().copied().collect();
        deque.reserve_back(deque.len() + extra);
        let segments = deque.segment_count();
        for value in 0..extra as i32 {
            deque.push_back(value);
        }
        prop_assert_eq!(deque.segment_count(), segments);
        deque.reserve_front(deque.len() + extra);
        let segments_front = deque.segment_count();
        for value in 0..extra as i32 {
            deque.push_front(value);
        }
        prop_assert_eq!(deque.segment_count(), segments_front);
        prop_assert_eq!(deque.len(), values.len() + 2 * extra);
        deque.reserve(deque.len() + 3 * extra);
        deque.shrink_to_fit();
        check_batch_deque(&deque);
    }

    #[test]
    fn cursor_round_trip(
        front in prop::collection::vec(any::<i32>(), 0..30),
        back in prop::collection::vec(any::<i32>(), 1..30),
        i in any::<usize>(),
        j in any::<usize>(),
    ) {
        let deque = deque_from::<3>(&front, &back);
        let len = deque.len();
        let (i, j) = (i % (len + 1), j % (len + 1));
        let a = deque.cursor_at(i);
        let b = deque.cursor_at(j);
        let delta = j as isize - i as isize;
        prop_assert_eq!(b - a, delta);
        prop_assert_eq!(a + delta, b);
        prop_assert_eq!(b - delta, a);
        prop_assert_eq!(a.position(), i as isize);
        prop_assert_eq!(a.get(), deque.get(i));
        prop_assert_eq!(i.cmp(&j), a.cmp(&b));
    }

    #[test]
    fn pushes_keep_addresses(
        front in prop::collection::vec(any::<i32>(), 0..40),
        back in prop::collection::vec(any::<i32>(), 0..40),
    ) {
        let mut deque = BatchDeque::<i32, 4>::new();
        deque.push_back(7);
        let pinned = &deque[0] as *const i32;
        for &value in &back {
            deque.push_back(value);
        }
        for &value in &front {
            deque.push_front(value);
        }
        prop_assert_eq!(&deque[front.len()] as *const i32, pinned);
        check_batch_deque(&deque);
    }

    #[test]
    fn swap_exchanges_contents(
        a in prop::collection::vec(any::<i32>(), 0..12),
        b in prop::collection::vec(any::<i32>(), 0..12),
    ) {
        let mut x: Devector<i32, 4> = a.iter().copied().collect();
        let mut y: Devector<i32, 4> = b.iter().copied().collect();
        x.swap(&mut y);
        prop_assert_eq!(x.as_slice(), &b[..]);
        prop_assert_eq!(y.as_slice(), &a[..]);
        check_devector(&x);
        check_devector(&y);

        let mut x: BatchDeque<i32, 4> = a.iter().copied().collect();
        let mut y: BatchDeque<i32, 4> = b.iter().copied().collect();
        x.swap(&mut y);
        prop_assert_eq!(x.iter().copied().collect::<Vec<_>>(), b);
        prop_assert_eq!(y.iter().copied().collect::<Vec<_>>(), a);
    }

    #[test]
    fn clone_is_equal(
        front in prop::collection::vec(any::<i32>(), 0..20),
        back in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let deque = deque_from::<4>(&front, &back);
        let clone = deque.clone();
        prop_assert_eq!(&clone, &deque);
        check_batch_deque(&clone);

        let dev: Devector<i32, 2> = deque.iter().copied().collect();
        let mut other: Devector<i32, 2> = Devector::from_elem(3, 0);
        other.clone_from(&dev);
        prop_assert_eq!(other, dev);
    }

    #[test]
    fn split_off_then_append_restores(
        values in prop::collection::vec(any::<i32>(), 0..60),
        at in any::<usize>(),
    ) {
        let mut deque: BatchDeque<i32, 4> = values.iter().copied().collect();
        let at = at % (values.len() + 1);
        let mut tail = deque.split_off(at);
        prop_assert_eq!(deque.len(), at);
        check_batch_deque(&deque);
        check_batch_deque(&tail);
        deque.append(&mut tail);
        prop_assert!(tail.is_empty());
        prop_assert_eq!(deque.iter().copied().collect::<Vec<_>>(), values);
        check_batch_deque(&deque);
    }

    #[test]
    fn stable_insert_matches_model(
        values in prop::collection::vec(any::<i32>(), 0..40),
        inserted in prop::collection::vec(any::<i32>(), 0..20),
        index in any::<usize>(),
    ) {
        let mut deque: BatchDeque<i32, 4> = values.iter().copied().collect();
        let index = index % (values.len() + 1);
        let prefix: Vec<*const i32> = (0..index).map(|i| &deque[i] as *const i32).collect();
        deque.stable_insert(index, inserted.iter().copied());

        let mut model = values.clone();
        model.splice(index..index, inserted.iter().copied());
        prop_assert_eq!(deque.iter().copied().collect::<Vec<_>>(), model);
        for (i, ptr) in prefix.into_iter().enumerate() {
            prop_assert_eq!(&deque[i] as *const i32, ptr);
        }
        check_batch_deque(&deque);
    }
}
