//! Restricting a stepped event table to an exact interval.
//!
//! A stepped table has a delta column telling how long each row's state holds.
//! Events rarely fall on the boundaries of the interval of interest:
//!
//! ```text
//!   |   [   |   ]   |
//!   e0  s   e1  e   e2
//! ```
//!
//! `e0` is pulled forward to `s` with its delta cut to `min(e1 - s, e - s)`, and the
//! last event inside is cut so it does not run past `e`. The result therefore covers
//! exactly `[s, e]`, which is what duration accounting over arbitrary sub-intervals
//! needs.
use stepwise_types::{AnalysisError, Table, TimeIndexed, Value};
use tracing::{trace, warn};

/// Slice a stepped `table` to `[start, end]`, synthesizing an event at `start`.
///
/// The table is assumed to be continuous: every row but the last has a successor at
/// `timestamp + delta`. See [`check_continuity`].
pub fn squash(
    table: &Table,
    start: f64,
    end: f64,
    delta_column: &str,
) -> Result<Table, AnalysisError> {
    if table.is_empty() {
        return Ok(table.clone());
    }

    let deltas = table.numeric_column(delta_column)?;
    let deltas = deltas.values();
    let index = table.index();
    let last = index.len() - 1;

    let trace_end = deltas[last].map(|d| index[last] + d);
    let end = match trace_end {
        Some(trace_end) if trace_end < end => {
            warn!(requested = end, trace_end, "squash end clamped to end of trace");
            trace_end
        }
        _ => end,
    };
    // Nothing is in effect over an empty interval
    if start >= end {
        return Ok(table.empty_like());
    }

    // Rows [0, before_end) are at or before `start`, rows [inside_start, inside_end)
    // lie within `[start, end]`.
    let before_end = index.partition_point(|t| *t <= start);
    let inside_start = index.partition_point(|t| *t < start);
    let inside_end = index.partition_point(|t| *t <= end);
    let inside = inside_start..inside_end;
    let start_hit = !inside.is_empty() && index[inside_start] == start;

    let mut picks = Vec::with_capacity(inside.len() + 1);
    let mut leading_delta = None;
    if before_end > 0 && !start_hit {
        let first_inside = if inside.is_empty() {
            end
        } else {
            index[inside_start]
        };
        picks.push((start, before_end - 1));
        leading_delta = Some((first_inside - start).min(end - start));
    }
    picks.extend(inside.clone().map(|row| (index[row], row)));

    let mut trailing_delta = None;
    if !inside.is_empty() {
        if index[inside_end - 1] == end {
            // That event starts the segment after the interval
            picks.pop();
        } else {
            let (t_last, row) = picks[picks.len() - 1];
            let cap = end - t_last;
            trailing_delta = Some(deltas[row].map_or(cap, |d| cap.min(d)));
        }
    }

    trace!(start, end, ?leading_delta, ?trailing_delta, rows = picks.len(), "squash");

    let mut squashed = table.restamp_rows(&picks)?;
    if let Some(delta) = leading_delta {
        squashed.set_cell(0, delta_column, Some(Value::Float(delta)))?;
    }
    if let Some(delta) = trailing_delta {
        let row = squashed.len() - 1;
        squashed.set_cell(row, delta_column, Some(Value::Float(delta)))?;
    }
    Ok(squashed)
}

/// Check that every row but the last is followed by a row at `timestamp + delta`.
///
/// [`squash`] relies on this without checking it. The comparison tolerates float
/// rounding relative to the magnitude of the timestamps.
pub fn check_continuity(table: &Table, delta_column: &str) -> Result<(), AnalysisError> {
    let deltas = table.numeric_column(delta_column)?;
    let index = table.index();
    for (row, pair) in index.windows(2).enumerate() {
        let expected = deltas.values()[row].map(|d| pair[0] + d);
        let tolerance = 1e-9 * pair[1].abs().max(1.0);
        match expected {
            Some(expected) if (expected - pair[1]).abs() <= tolerance => {}
            _ => {
                return Err(AnalysisError::InvalidArgument(format!(
                    "row {row} at {} with {delta_column} {:?} is not followed by an event at its end (next event at {})",
                    pair[0],
                    deltas.values()[row],
                    pair[1]
                )));
            }
        }
    }
    Ok(())
}
