//! Growth policies for [`Devector`](super::Devector).

/// Decides how a [`Devector`](super::Devector) grows, shrinks and splits its
/// inline buffer.
pub trait GrowthPolicy {
    /// Whether an empty inline buffer starts with its free space split evenly
    /// between both ends instead of all of it at the back.
    const INLINE_SPLIT: bool = false;

    /// Capacity of the next heap buffer, given the current `capacity` and the
    /// `required` element count. Results below `required` are raised to it.
    fn new_capacity(capacity: usize, required: usize) -> usize;

    /// Whether [`shrink_to_fit`](super::Devector::shrink_to_fit) should give
    /// memory back.
    fn should_shrink(len: usize, capacity: usize, inline_capacity: usize) -> bool {
        let _ = inline_capacity;
        len < capacity
    }
}

/// Starting front offset of an empty inline buffer of `inline_capacity`.
#[inline]
pub(crate) const fn inline_front_reserve<G: GrowthPolicy>(inline_capacity: usize) -> usize {
    if G::INLINE_SPLIT { inline_capacity / 2 } else { 0 }
}

/// Quadruples, starting at 4. Shrinks whenever there is slack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Aggressive;

impl GrowthPolicy for Aggressive {
    #[inline]
    fn new_capacity(capacity: usize, required: usize) -> usize {
        capacity.saturating_mul(4).max(4).max(required)
    }
}

/// Doubles, starting at 4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Doubling;

impl GrowthPolicy for Doubling {
    #[inline]
    fn new_capacity(capacity: usize, required: usize) -> usize {
        capacity.saturating_mul(2).max(4).max(required)
    }
}

/// Grows by half, splits the inline buffer evenly and only shrinks buffers
/// that are less than half used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Balanced;

impl GrowthPolicy for Balanced {
    const INLINE_SPLIT: bool = true;

    #[inline]
    fn new_capacity(capacity: usize, required: usize) -> usize {
        capacity.saturating_add(capacity / 2).max(4).max(required)
    }

    #[inline]
    fn should_shrink(len: usize, capacity: usize, inline_capacity: usize) -> bool {
        len < capacity / 2 || (len <= inline_capacity && capacity > inline_capacity)
    }
}
