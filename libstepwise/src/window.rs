//! Selecting a time window out of a signal.
use std::str::FromStr;

use derive_more::Display;
use enum_iterator::Sequence;
use serde::Serialize;
use stepwise_types::{AnalysisError, TimeIndexed, validate_index};
use tracing::trace;

/// How a window boundary that does not hit a timestamp exactly is resolved.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Sequence, Serialize)]
pub enum WindowPolicy {
    /// Widen to the sample at or before the start and the sample at or after the
    /// end, so the selection straddles the window.
    #[default]
    #[display("inclusive")]
    Inclusive,
    /// Narrow to the samples inside the window.
    #[display("exclusive")]
    Exclusive,
    /// Snap each boundary to the closest sample. Ties go to the later sample.
    #[display("nearest")]
    Nearest,
}

impl FromStr for WindowPolicy {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inclusive" => Ok(WindowPolicy::Inclusive),
            "exclusive" => Ok(WindowPolicy::Exclusive),
            "nearest" => Ok(WindowPolicy::Nearest),
            other => Err(AnalysisError::UnsupportedPolicy(other.to_string())),
        }
    }
}

/// Last row stamped at or before `ts`.
fn at_or_before(index: &[f64], ts: f64) -> Option<usize> {
    index.partition_point(|t| *t <= ts).checked_sub(1)
}

/// First row stamped at or after `ts`.
fn at_or_after(index: &[f64], ts: f64) -> Option<usize> {
    let idx = index.partition_point(|t| *t < ts);
    (idx < index.len()).then_some(idx)
}

fn closest(index: &[f64], ts: f64) -> Option<usize> {
    match (at_or_before(index, ts), at_or_after(index, ts)) {
        (Some(before), Some(after)) => {
            if ts - index[before] < index[after] - ts {
                Some(before)
            } else {
                Some(after)
            }
        }
        (before, after) => before.or(after),
    }
}

/// Resolve `(start, end)` into an inclusive row range, or `None` for an empty selection.
fn resolve_rows(index: &[f64], (start, end): (f64, f64), policy: WindowPolicy) -> Option<(usize, usize)> {
    if index.is_empty() || start > end {
        return None;
    }
    let last = index.len() - 1;
    let (first_row, last_row) = match policy {
        // Widening never reaches into data the window does not overlap
        WindowPolicy::Inclusive if end < index[0] || start > index[last] => return None,
        WindowPolicy::Inclusive => (
            at_or_before(index, start).unwrap_or(0),
            at_or_after(index, end).unwrap_or(last),
        ),
        WindowPolicy::Exclusive => (at_or_after(index, start)?, at_or_before(index, end)?),
        WindowPolicy::Nearest => (closest(index, start)?, closest(index, end)?),
    };
    (first_row <= last_row).then_some((first_row, last_row))
}

/// Select the rows of `data` that fall within `window` under `policy`.
///
/// Both resolved boundaries are part of the selection. A window whose start lies
/// after its end selects nothing.
pub fn select<T: TimeIndexed>(
    data: &T,
    window: (f64, f64),
    policy: WindowPolicy,
) -> Result<T, AnalysisError> {
    let index = data.index();
    validate_index(index)?;

    let rows = resolve_rows(index, window, policy);
    trace!(?window, %policy, ?rows, "resolved window");
    Ok(match rows {
        Some((first, last)) => data.slice_rows(first..last + 1),
        None => data.slice_rows(0..0),
    })
}
