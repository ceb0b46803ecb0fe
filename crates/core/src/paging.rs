//! Pagination windows over ordered listings.

use serde::{Deserialize, Serialize};

/// Requested pagination parameters as supplied by a caller.
///
/// Values are signed because they come straight from the transport; negative
/// and missing values are normalized by [`compute_window`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub start: Option<i64>,
    pub limit: Option<i64>,
}

impl Paging {
    pub fn new(start: Option<i64>, limit: Option<i64>) -> Self {
        Self { start, limit }
    }

    /// No pagination: the whole listing.
    pub fn all() -> Self {
        Self::default()
    }

    /// Window for a listing of `total` items.
    pub fn window(&self, total: usize) -> (usize, usize) {
        compute_window(total, self.start, self.limit)
    }
}

/// Compute the `[from, to)` slice window for a listing of `total` items.
///
/// `start` is clamped to `[0, total]`. A missing or non-positive `limit`
/// extends the window to `total`. Always `0 <= from <= to <= total`.
pub fn compute_window(total: usize, start: Option<i64>, limit: Option<i64>) -> (usize, usize) {
    let from = match start {
        Some(s) if s > 0 => usize::try_from(s).unwrap_or(usize::MAX).min(total),
        _ => 0,
    };
    let to = match limit {
        Some(l) if l > 0 => from
            .saturating_add(usize::try_from(l).unwrap_or(usize::MAX))
            .min(total),
        _ => total,
    };
    (from, to)
}

/// One page of a listing together with the size of the full listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Slice `items` according to `paging`, recording the unsliced total.
    pub fn from_listing(mut items: Vec<T>, paging: Paging) -> Self {
        let total = items.len();
        let (from, to) = paging.window(total);
        items.truncate(to);
        let items = items.split_off(from);
        Self { total, items }
    }
}
