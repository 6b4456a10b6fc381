//! Python-style sequence indexing shared by every sequence type of the runtime (str, list, tuple, range).
//!
//! Indices are counted in elements (Unicode scalars for strings); negative indices count from the end.

/// Why a slice could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceError {
    StepZero,
}

impl SliceError {
    pub fn message(self) -> &'static str {
        match self {
            SliceError::StepZero => "slice step cannot be zero",
        }
    }
}

/// Normalize an index (supports negatives). Returns `None` if out of range.
///
/// ## Examples
/// ```rust
/// use runtest_core::sequences::normalize_index;
///
/// assert_eq!(normalize_index(3, -1), Some(2));
/// assert_eq!(normalize_index(3, 3), None);
/// ```
pub fn normalize_index(len: usize, idx: i64) -> Option<usize> {
    let len_i = i64::try_from(len).ok()?;
    let i = if idx < 0 { idx.checked_add(len_i)? } else { idx };
    if i < 0 || i >= len_i { None } else { usize::try_from(i).ok() }
}

/// Element positions selected by `seq[start:end:step]` on a sequence of length `len`.
///
/// ## Notes
/// - Bounds are clamped the way CPython clamps them; out-of-range bounds never fail.
///
/// ## Examples
/// ```rust
/// use runtest_core::sequences::slice_indices;
///
/// assert_eq!(slice_indices(5, Some(1), None, None), Ok(vec![1, 2, 3, 4]));
/// assert_eq!(slice_indices(5, None, None, Some(-2)), Ok(vec![4, 2, 0]));
/// ```
pub fn slice_indices(
    len: usize,
    start: Option<i64>,
    end: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, SliceError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(SliceError::StepZero);
    }
    let len = i64::try_from(len).unwrap_or(i64::MAX);

    let default_start = if step > 0 { 0 } else { len - 1 };
    let default_end = if step > 0 { len } else { -1 };

    let resolve = |idx: i64| if idx < 0 { idx.saturating_add(len) } else { idx };
    let (mut start_idx, mut end_idx) = (
        start.map(resolve).unwrap_or(default_start),
        end.map(resolve).unwrap_or(default_end),
    );

    if step > 0 {
        start_idx = start_idx.clamp(0, len);
        end_idx = end_idx.clamp(0, len);
    } else {
        start_idx = start_idx.clamp(-1, len - 1);
        // An explicit negative end that still resolves below zero means "through the first element".
        end_idx = end_idx.clamp(-1, len - 1);
    }

    let mut out = Vec::new();
    let mut i = start_idx;
    while (step > 0 && i < end_idx) || (step < 0 && i > end_idx) {
        out.push(i as usize);
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(out)
}

/// Number of values produced by `range(start, stop, step)`; `step` must be non-zero.
pub fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let span = if step > 0 { stop - start } else { start - stop };
    if span <= 0 {
        return 0;
    }
    let step = step.abs();
    usize::try_from((span + step - 1) / step).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(0, 0), None);
        assert_eq!(normalize_index(4, -4), Some(0));
        assert_eq!(normalize_index(4, -5), None);
        assert_eq!(normalize_index(4, 3), Some(3));
    }

    #[test]
    fn test_slice_indices() {
        assert_eq!(slice_indices(5, Some(-2), None, None), Ok(vec![3, 4]));
        assert_eq!(slice_indices(5, Some(10), Some(20), None), Ok(vec![]));
        assert_eq!(slice_indices(5, None, None, Some(-1)), Ok(vec![4, 3, 2, 1, 0]));
        assert_eq!(slice_indices(5, Some(3), Some(0), Some(-1)), Ok(vec![3, 2, 1]));
        assert_eq!(slice_indices(5, None, Some(-10), Some(-1)), Ok(vec![4, 3, 2, 1, 0]));
        assert_eq!(slice_indices(3, None, None, Some(0)), Err(SliceError::StepZero));
    }

    #[test]
    fn test_range_len() {
        assert_eq!(range_len(0, 10, 1), 10);
        assert_eq!(range_len(0, 10, 3), 4);
        assert_eq!(range_len(10, 0, -2), 5);
        assert_eq!(range_len(5, 5, 1), 0);
        assert_eq!(range_len(5, 0, 1), 0);
    }
}
