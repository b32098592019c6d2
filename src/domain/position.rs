//! Integer ordering keys for lists and cards.
//!
//! Keys are only compared relative to each other. New keys are placed in the
//! gap between neighbours, so repeated inserts into one slot halve that gap
//! until two neighbours hold adjacent integers. `allocate_between` reports
//! that condition so the caller can re-key the list with `rebalance`.

/// Key used for the first item of an empty list, and as the head fallback.
pub const DEFAULT_POSITION: i64 = 1024;
/// Distance kept in front of the current head when inserting before it.
pub const HEAD_STEP: i64 = 512;
/// Distance kept after the current tail when appending.
pub const TAIL_STEP: i64 = 1024;

/// Computes a key for an item placed between `left` and `right`.
///
/// `None` on a side means there is no neighbour there. This never fails, but
/// the result is not guaranteed to sort strictly between the neighbours once
/// their gap is exhausted; use [`allocate_between`] when that matters.
pub fn allocate(left: Option<i64>, right: Option<i64>) -> i64 {
    match (left, right) {
        (None, None) => DEFAULT_POSITION,
        (None, Some(r)) => {
            let key = r.saturating_sub(HEAD_STEP);
            if key <= 0 {
                DEFAULT_POSITION
            } else {
                key
            }
        }
        (Some(l), None) => l.saturating_add(TAIL_STEP),
        (Some(l), Some(r)) => floor_midpoint(l, r),
    }
}

/// floor((l + r) / 2) without overflowing.
fn floor_midpoint(l: i64, r: i64) -> i64 {
    (l >> 1) + (r >> 1) + (l & r & 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no free key between {left:?} and {right:?}")]
pub struct KeySpaceExhausted {
    pub left: Option<i64>,
    pub right: Option<i64>,
}

/// Like [`allocate`], but only returns keys that sort strictly after `left`
/// and strictly before `right`.
pub fn allocate_between(left: Option<i64>, right: Option<i64>) -> Result<i64, KeySpaceExhausted> {
    let key = allocate(left, right);
    let after_left = left.map_or(true, |l| key > l);
    let before_right = right.map_or(true, |r| key < r);
    if after_left && before_right {
        Ok(key)
    } else {
        Err(KeySpaceExhausted { left, right })
    }
}

/// Evenly spaced keys for `count` items in their current order.
pub fn rebalance(count: usize) -> Vec<i64> {
    (1..=count as i64).map(|i| i * DEFAULT_POSITION).collect()
}
