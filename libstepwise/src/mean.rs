use stepwise_types::{AnalysisError, Series};

use crate::integrate::{IntegrateOptions, integrate};
use crate::series_ops::resolve_x;

/// Average of `y` over the extent of `x`: its integral divided by `max(x) - min(x)`.
pub fn mean(y: &Series, x: Option<&Series>, options: &IntegrateOptions) -> Result<f64, AnalysisError> {
    let x = resolve_x(y, x);
    let (min, max) = x
        .values()
        .iter()
        .flatten()
        .fold(None, |bounds: Option<(f64, f64)>, v| match bounds {
            Some((min, max)) => Some((min.min(*v), max.max(*v))),
            None => Some((*v, *v)),
        })
        .ok_or(AnalysisError::DegenerateDomain)?;
    let width = max - min;
    if width == 0.0 {
        return Err(AnalysisError::DegenerateDomain);
    }
    Ok(integrate(y, Some(&x), options)? / width)
}
