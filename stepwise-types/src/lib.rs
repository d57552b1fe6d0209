//! Signal representation shared by the stepwise operators.
//!
//! A trace is a sequence of events at strictly increasing timestamps. Numeric signals
//! are [`Series`], multi-column event logs are [`Table`]s. Both validate their time
//! axis on construction, so every operator can rely on a sorted, duplicate-free index.
mod error;
mod series;
mod table;
mod value;

use std::ops::Range;

pub use crate::error::{AnalysisError, validate_index};
pub use crate::series::Series;
pub use crate::table::Table;
pub use crate::value::Value;

/// Anything with a sorted time axis whose rows can be sliced out.
pub trait TimeIndexed: Sized {
    /// Strictly increasing timestamps, one per row.
    fn index(&self) -> &[f64];

    /// The rows in `rows` as a new value.
    fn slice_rows(&self, rows: Range<usize>) -> Self;
}
