use stepwise_types::{AnalysisError, Series};
use tracing::debug;

use crate::series_ops::{diff, resolve_x, zip_union};

/// Derivative of `y` with respect to `x`, applied `order` times.
///
/// `x` defaults to the timestamps of `y`. Each pass divides the first difference of
/// `y` by the first difference of `x` on the union of both time axes, so the first
/// `order` samples are missing, as is any timestamp only one side has. A division
/// that does not give a finite number is missing too.
pub fn derivative(y: &Series, x: Option<&Series>, order: usize) -> Result<Series, AnalysisError> {
    let x = resolve_x(y, x);
    let dx = diff(&x);
    debug!(samples = y.len(), order, "derivative");

    (0..order).try_fold(y.clone(), |y, _| zip_union(&diff(&y), &dx, |dy, dx| dy / dx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_types::TimeIndexed;
    use test_log::test;

    fn squares() -> Series {
        Series::from_samples((0..6).map(|t| (f64::from(t), f64::from(t * t)))).unwrap()
    }

    #[test]
    fn first_derivative_of_squares() {
        let d = derivative(&squares(), None, 1).unwrap();
        assert_eq!(
            d.values(),
            &[None, Some(1.0), Some(3.0), Some(5.0), Some(7.0), Some(9.0)]
        );
    }

    #[test]
    fn second_derivative_is_constant() {
        let d = derivative(&squares(), None, 2).unwrap();
        assert_eq!(
            d.values(),
            &[None, None, Some(2.0), Some(2.0), Some(2.0), Some(2.0)]
        );
    }

    #[test]
    fn orders_compose() {
        let y = Series::from_samples([(0.0, 1.0), (0.5, 3.0), (2.0, 2.0), (2.5, 7.0), (4.0, 0.0)])
            .unwrap();
        let twice = derivative(&derivative(&y, None, 1).unwrap(), None, 1).unwrap();
        assert_eq!(derivative(&y, None, 2).unwrap(), twice);
    }

    #[test]
    fn order_zero_is_identity() {
        assert_eq!(derivative(&squares(), None, 0).unwrap(), squares());
    }

    #[test]
    fn explicit_x_and_disjoint_timestamps() {
        let y = Series::from_samples([(0.0, 0.0), (1.0, 4.0), (2.0, 8.0)]).unwrap();
        let x = Series::from_samples([(0.0, 0.0), (1.0, 2.0), (3.0, 4.0)]).unwrap();
        let d = derivative(&y, Some(&x), 1).unwrap();
        assert_eq!(d.index(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(d.values(), &[None, Some(2.0), None, None]);
    }

    #[test]
    fn flat_x_gives_missing() {
        let y = Series::from_samples([(0.0, 0.0), (1.0, 1.0)]).unwrap();
        let x = Series::from_samples([(0.0, 5.0), (1.0, 5.0)]).unwrap();
        assert_eq!(derivative(&y, Some(&x), 1).unwrap().values(), &[None, None]);
    }
}
