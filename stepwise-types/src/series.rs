use std::ops::Range;

use serde::Serialize;

use crate::error::{AnalysisError, validate_index};
use crate::TimeIndexed;

/// A numeric signal sampled at strictly increasing timestamps.
///
/// Each sample is either a value or missing (`None`). NaN is never stored: the
/// constructors turn it into a missing sample so it cannot leak into later arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    index: Vec<f64>,
    values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(index: Vec<f64>, values: Vec<Option<f64>>) -> Result<Self, AnalysisError> {
        if index.len() != values.len() {
            return Err(AnalysisError::LengthMismatch {
                expected: index.len(),
                actual: values.len(),
            });
        }
        validate_index(&index)?;
        let values = values
            .into_iter()
            .map(|v| v.filter(|v| !v.is_nan()))
            .collect();
        Ok(Self { index, values })
    }

    /// Build a series with every sample present.
    pub fn from_values(index: Vec<f64>, values: Vec<f64>) -> Result<Self, AnalysisError> {
        Self::new(index, values.into_iter().map(Some).collect())
    }

    /// Build a series from `(timestamp, value)` pairs, already in time order.
    pub fn from_samples<I>(samples: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (index, values): (Vec<f64>, Vec<Option<f64>>) =
            samples.into_iter().map(|(t, v)| (t, Some(v))).unzip();
        Self::new(index, values)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, Option<f64>)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Samples that carry a value.
    pub fn valid(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.iter().filter_map(|(t, v)| v.map(|v| (t, v)))
    }

    #[must_use]
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }

    /// Row of the sample stamped exactly `ts`.
    #[must_use]
    pub fn position(&self, ts: f64) -> Option<usize> {
        self.index.binary_search_by(|t| t.total_cmp(&ts)).ok()
    }

    /// Value stamped exactly `ts`, if there is one and it is not missing.
    #[must_use]
    pub fn value_at(&self, ts: f64) -> Option<f64> {
        self.position(ts).and_then(|idx| self.values[idx])
    }

    /// Apply `f` to every present sample, keeping the index.
    #[must_use]
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            values: self
                .values
                .iter()
                .map(|v| v.map(&f).filter(|v| !v.is_nan()))
                .collect(),
        }
    }

    /// Same index, new values.
    ///
    /// # Panics
    /// Panics if `values` does not hold exactly one entry per timestamp.
    #[must_use]
    pub fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        assert_eq!(values.len(), self.len(), "One value per timestamp");
        Self {
            index: self.index.clone(),
            values: values
                .into_iter()
                .map(|v| v.filter(|v| !v.is_nan()))
                .collect(),
        }
    }

    /// A series whose values are its own timestamps.
    #[must_use]
    pub fn timestamps_as_series(&self) -> Self {
        Self {
            index: self.index.clone(),
            values: self.index.iter().copied().map(Some).collect(),
        }
    }

    /// Smallest gap between two consecutive timestamps.
    #[must_use]
    pub fn min_spacing(&self) -> Option<f64> {
        self.index
            .windows(2)
            .map(|w| w[1] - w[0])
            .min_by(f64::total_cmp)
    }
}

impl TimeIndexed for Series {
    fn index(&self) -> &[f64] {
        &self.index
    }

    fn slice_rows(&self, rows: Range<usize>) -> Self {
        Self {
            index: self.index[rows.clone()].to_vec(),
            values: self.values[rows].to_vec(),
        }
    }
}
