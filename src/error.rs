use core::alloc::Layout;

/// Failure of a checked element access or of a range argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RangeError {
    #[error("index (is {index}) should be < len (is {len})")]
    OutOfBounds { index: usize, len: usize },
    #[error("range starts at {start} but ends at {end}")]
    StartAfterEnd { start: usize, end: usize },
    #[error("range end index {end} out of range for length {len}")]
    EndOutOfBounds { end: usize, len: usize },
    #[error("range bound overflows usize")]
    Overflow,
}

/// Failure to provide the requested amount of storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CapacityError {
    #[error("requested capacity (is {requested}) exceeds max_size (is {max_size})")]
    CapacityOverflow { requested: usize, max_size: usize },
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError { layout: Layout },
}

/// Turns a [`CapacityError`] into the panic (or allocation-failure hook) that
/// the non-`try_` operations promise.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn handle_capacity_error(err: CapacityError) -> ! {
    match err {
        CapacityError::AllocError { layout } => std::alloc::handle_alloc_error(layout),
        err @ CapacityError::CapacityOverflow { .. } => panic!("{err}"),
    }
}
