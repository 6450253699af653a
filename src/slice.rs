use std::ops;

use crate::error::RangeError;

/// Resolves `range` against a sequence of `bounds.end` elements.
pub fn range<R>(range: R, bounds: ops::RangeTo<usize>) -> Result<ops::Range<usize>, RangeError>
where
    R: ops::RangeBounds<usize>,
{
    let len = bounds.end;

    let start = match range.start_bound() {
        ops::Bound::Included(&start) => start,
        ops::Bound::Excluded(start) => start.checked_add(1).ok_or(RangeError::Overflow)?,
        ops::Bound::Unbounded => 0,
    };

    let end = match range.end_bound() {
        ops::Bound::Included(end) => end.checked_add(1).ok_or(RangeError::Overflow)?,
        ops::Bound::Excluded(&end) => end,
        ops::Bound::Unbounded => len,
    };

    if start > end {
        return Err(RangeError::StartAfterEnd { start, end });
    }
    if end > len {
        return Err(RangeError::EndOutOfBounds { end, len });
    }

    Ok(ops::Range { start, end })
}

/// Like [`range`], but panics with the error message.
#[track_caller]
pub(crate) fn checked_range<R>(r: R, len: usize) -> ops::Range<usize>
where
    R: ops::RangeBounds<usize>,
{
    range(r, ..len).unwrap_or_else(|err| panic!("{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_range() {
        assert_eq!(range(.., ..5), Ok(0..5));
        assert_eq!(range(1..=2, ..5), Ok(1..3));
        assert_eq!(
            range(3..2, ..5),
            Err(RangeError::StartAfterEnd { start: 3, end: 2 })
        );
        assert_eq!(
            range(..6, ..5),
            Err(RangeError::EndOutOfBounds { end: 6, len: 5 })
        );
        assert_eq!(range(..=usize::MAX, ..5), Err(RangeError::Overflow));
    }
}
