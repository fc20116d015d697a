#![forbid(unsafe_code)]

use crate::error::StoreFault;
use crate::store::TreeStore;
use tracing::trace;

/// Opens `width` free positions at `at`: rows with `lft > at` and rows with `rgt >= at` move
/// right. A parent whose `rgt` equals `at` widens to take the new positions.
pub(super) fn open_gap<S>(store: &mut S, at: i64, width: i64) -> Result<(), StoreFault>
where
    S: TreeStore + ?Sized,
{
    let lefts = store.shift_left(at, width)?;
    let rights = store.shift_right(at, width)?;
    trace!(at, width, lefts, rights, "opened gap");
    Ok(())
}

/// Closes the gap left by an interval of `width` ending at `end`: every endpoint past `end`
/// moves left by `width`.
pub(super) fn close_gap<S>(store: &mut S, end: i64, width: i64) -> Result<(), StoreFault>
where
    S: TreeStore + ?Sized,
{
    let lefts = store.shift_left(end, -width)?;
    let rights = store.shift_right(end + 1, -width)?;
    trace!(end, width, lefts, rights, "closed gap");
    Ok(())
}
