//! Aligning a signal on a reference by cross-correlation.
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use stepwise_types::{AnalysisError, Series, TimeIndexed};
use tracing::{debug, trace, warn};

use crate::series_ops::shift;

/// Outcome of [`align`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// The reference, resampled on the common grid.
    pub reference: Series,
    /// The other signal on the same grid, moved by `-shift_samples`.
    pub aligned: Series,
    /// How many grid samples the signal lagged the reference.
    pub shift_samples: isize,
    /// `shift_samples` in time units.
    pub shift: f64,
    /// Spacing of the common grid.
    pub period: f64,
}

/// Resample `reference` and `to_align` on a common uniform grid over their overlap
/// and shift `to_align` to best match `reference`.
///
/// The lag is where the cross-correlation of the two peaks. With `max_shift` set,
/// the lag is limited to `max_shift` time units, rounded down to whole samples.
pub fn align(
    reference: &Series,
    to_align: &Series,
    max_shift: Option<f64>,
) -> Result<Alignment, AnalysisError> {
    if reference.has_missing() || to_align.has_missing() {
        return Err(AnalysisError::MissingValues);
    }
    if let Some(max_shift) = max_shift
        && !(max_shift.is_finite() && max_shift >= 0.0)
    {
        return Err(AnalysisError::InvalidArgument(format!(
            "max_shift must be a non-negative number, got {max_shift}"
        )));
    }
    let (Some(ref_spacing), Some(other_spacing)) = (reference.min_spacing(), to_align.min_spacing())
    else {
        return Err(AnalysisError::InvalidArgument(
            "alignment needs at least two samples in each signal".to_string(),
        ));
    };

    let start = reference.index()[0].max(to_align.index()[0]);
    let end = reference.index()[reference.len() - 1].min(to_align.index()[to_align.len() - 1]);
    if start >= end {
        return Err(AnalysisError::InvalidArgument(format!(
            "signals do not overlap (common range {start} to {end})"
        )));
    }
    let period = ref_spacing.min(other_spacing);
    let grid = uniform_grid(start, end, period);

    let reference = resample(reference, &grid)?;
    let to_align = resample(to_align, &grid)?;
    let a = present(&to_align);
    let r = present(&reference);

    let mut shift_samples = peak_lag(&a, &r);
    if let Some(max_shift) = max_shift {
        let limit = (max_shift / period).floor() as isize;
        if shift_samples.abs() > limit {
            warn!(
                found = shift_samples,
                limit, "alignment shift clamped to max_shift"
            );
            shift_samples = limit * shift_samples.signum();
        }
    }
    debug!(samples = grid.len(), period, shift_samples, "align");

    Ok(Alignment {
        aligned: shift(&to_align, -shift_samples),
        reference,
        shift_samples,
        shift: shift_samples as f64 * period,
        period,
    })
}

/// `start + k * period` for every `k` that stays within `end`.
fn uniform_grid(start: f64, end: f64, period: f64) -> Vec<f64> {
    // Tolerate rounding on the last step so `end` itself is not lost
    let steps = ((end - start) / period + 1e-9).floor() as usize;
    (0..=steps).map(|k| start + k as f64 * period).collect()
}

/// Sample `series` on `grid`, each point taking the last value at or before it.
fn resample(series: &Series, grid: &[f64]) -> Result<Series, AnalysisError> {
    let index = series.index();
    let values = grid
        .iter()
        .map(|t| {
            index
                .partition_point(|ts| ts <= t)
                .checked_sub(1)
                .and_then(|row| series.values()[row])
        })
        .collect();
    Series::new(grid.to_vec(), values)
}

fn present(series: &Series) -> Vec<f64> {
    series.values().iter().map(|v| v.unwrap_or(0.0)).collect()
}

/// Lag of `a` relative to `r`: the offset of the first maximum of their full
/// cross-correlation, recentred around zero.
fn peak_lag(a: &[f64], r: &[f64]) -> isize {
    let n = a.len() as isize;
    let correlation = cross_correlation(a, r);
    let peak = correlation.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Anything within FFT rounding of the peak ties with it
    let energy = a.iter().map(|v| v * v).sum::<f64>() * r.iter().map(|v| v * v).sum::<f64>();
    let tolerance = 1e-9 * energy.sqrt();
    let best = correlation
        .iter()
        .position(|c| *c >= peak - tolerance)
        .unwrap_or(0);
    trace!(peak, best, "cross-correlation peak");
    best as isize - (n - 1)
}

/// Full cross-correlation `c[k] = sum_l a[l] * r[l - k + len(r) - 1]`, computed as
/// the convolution of `a` with `r` reversed, through an FFT.
fn cross_correlation(a: &[f64], r: &[f64]) -> Vec<f64> {
    if a.is_empty() || r.is_empty() {
        return vec![];
    }
    let len = a.len() + r.len() - 1;
    let size = len.next_power_of_two();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut spectrum = zero_padded(a.iter().copied(), size);
    let mut reversed = zero_padded(r.iter().rev().copied(), size);
    forward.process(&mut spectrum);
    forward.process(&mut reversed);
    for (x, y) in spectrum.iter_mut().zip(&reversed) {
        *x *= *y;
    }
    inverse.process(&mut spectrum);

    // rustfft leaves the inverse unnormalized
    let scale = size as f64;
    spectrum[..len].iter().map(|c| c.re / scale).collect()
}

fn zero_padded(values: impl Iterator<Item = f64>, size: usize) -> Vec<Complex<f64>> {
    let mut padded: Vec<Complex<f64>> = values.map(|v| Complex::new(v, 0.0)).collect();
    padded.resize(size, Complex::new(0.0, 0.0));
    padded
}
