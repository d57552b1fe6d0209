//! Index-aligned arithmetic on [`Series`].
//!
//! Binary operations align their operands on the union of both time axes, the same
//! way a dataframe library would: a timestamp present on only one side yields a
//! missing sample rather than an error.
use itertools::{EitherOrBoth, Itertools};
use stepwise_types::{AnalysisError, Series};

/// The series to differentiate or integrate against: `x` itself, or `y`'s own
/// timestamps when no `x` is given.
#[must_use]
pub fn resolve_x(y: &Series, x: Option<&Series>) -> Series {
    match x {
        Some(x) => x.clone(),
        None => y.timestamps_as_series(),
    }
}

/// First difference. The first sample, and any sample following a missing one, is missing.
#[must_use]
pub fn diff(series: &Series) -> Series {
    let values = series.values();
    let diffs = std::iter::once(None)
        .chain(values.windows(2).map(|w| match (w[0], w[1]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        }))
        .take(values.len())
        .collect();
    series.with_values(diffs)
}

/// Move values by `periods` rows: positive moves them later in time, negative earlier.
/// Rows left without a value are missing.
#[must_use]
pub fn shift(series: &Series, periods: isize) -> Series {
    let values = series.values();
    let len = values.len() as isize;
    let shifted = (0..len)
        .map(|row| {
            let src = row - periods;
            if (0..len).contains(&src) {
                values[src as usize]
            } else {
                None
            }
        })
        .collect();
    series.with_values(shifted)
}

/// Combine two series sample by sample on the union of their timestamps.
///
/// `combine` only sees timestamps where both sides hold a value; its result is
/// treated as missing when it is not finite.
pub fn zip_union(
    lhs: &Series,
    rhs: &Series,
    combine: impl Fn(f64, f64) -> f64,
) -> Result<Series, AnalysisError> {
    let (index, values): (Vec<f64>, Vec<Option<f64>>) = lhs
        .iter()
        .merge_join_by(rhs.iter(), |(tl, _), (tr, _)| tl.total_cmp(tr))
        .map(|pair| match pair {
            EitherOrBoth::Both((t, l), (_, r)) => (
                t,
                l.zip(r)
                    .map(|(l, r)| combine(l, r))
                    .filter(|v| v.is_finite()),
            ),
            EitherOrBoth::Left((t, _)) | EitherOrBoth::Right((t, _)) => (t, None),
        })
        .unzip();
    Series::new(index, values)
}

/// Bound every present sample to `[lower, upper]`; either bound may be open.
#[must_use]
pub fn clip(series: &Series, lower: Option<f64>, upper: Option<f64>) -> Series {
    series.map_values(|v| {
        let v = lower.map_or(v, |lo| v.max(lo));
        upper.map_or(v, |hi| v.min(hi))
    })
}

/// Sum of the present samples; an all-missing series sums to zero.
#[must_use]
pub fn sum(series: &Series) -> f64 {
    series.values().iter().flatten().sum()
}

/// Rows where both series hold a value at the same timestamp, as `(x, y)` pairs in
/// time order.
#[must_use]
pub fn dropna_pairs(x: &Series, y: &Series) -> Vec<(f64, f64)> {
    x.iter()
        .merge_join_by(y.iter(), |(tx, _), (ty, _)| tx.total_cmp(ty))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both((_, x), (_, y)) => x.zip(y),
            _ => None,
        })
        .collect()
}
