//! Definite integrals of a signal.
//!
//! Stepped signals are integrated with rectangles: a step `post` signal takes its
//! new value right at the event, a step `pre` one holds each value until the next
//! event. For the samples `[0, 0, 2, 2, 2, 1, 1]` at `0..=6`:
//!
//! ```text
//!  post                              pre
//!  2        *----*----*              2   +----*----*----*
//!           |         |                  |              |
//!  1        |         *----*         1   |              +----*----*
//!           |                            |
//!  0  *----*                         0 --*
//!     0    1    2    3    4    5    6    0    1    2    3    4    5    6    7
//! ```
//!
//! which gives an area of 8 for `post` and 9 for `pre`, the latter holding the last
//! value for one more spacing.
use std::str::FromStr;

use derive_more::Display;
use enum_iterator::Sequence;
use serde::Serialize;
use stepwise_types::{AnalysisError, Series};
use tracing::debug;

use crate::series_ops::{clip, diff, dropna_pairs, resolve_x, sum, zip_union};

/// Which part of the signal takes part in the integral.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Sequence, Serialize)]
pub enum Sign {
    /// Negative samples count as zero.
    #[display("+")]
    Positive,
    /// Positive samples count as zero.
    #[display("-")]
    Negative,
}

impl FromStr for Sign {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Sign::Positive),
            "-" => Ok(Sign::Negative),
            other => Err(AnalysisError::UnsupportedSign(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Sequence, Serialize)]
pub enum IntegrationMethod {
    #[default]
    #[display("rect")]
    Rect,
    #[display("trapz")]
    Trapz,
    #[display("simps")]
    Simps,
}

impl FromStr for IntegrationMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rect" => Ok(IntegrationMethod::Rect),
            "trapz" => Ok(IntegrationMethod::Trapz),
            "simps" => Ok(IntegrationMethod::Simps),
            other => Err(AnalysisError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Where the rectangles of [`IntegrationMethod::Rect`] take their height from.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Sequence, Serialize)]
pub enum RectStep {
    #[default]
    #[display("post")]
    Post,
    #[display("pre")]
    Pre,
}

impl FromStr for RectStep {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(RectStep::Post),
            "pre" => Ok(RectStep::Pre),
            other => Err(AnalysisError::UnsupportedStep(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrateOptions {
    pub sign: Option<Sign>,
    pub method: IntegrationMethod,
    pub rect_step: RectStep,
}

impl IntegrateOptions {
    #[must_use]
    pub fn with_sign(mut self, sign: Sign) -> Self {
        self.sign = Some(sign);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: IntegrationMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_rect_step(mut self, rect_step: RectStep) -> Self {
        self.rect_step = rect_step;
        self
    }
}

/// Integral of `y` with respect to `x`, `x` defaulting to the timestamps of `y`.
pub fn integrate(
    y: &Series,
    x: Option<&Series>,
    options: &IntegrateOptions,
) -> Result<f64, AnalysisError> {
    let x = resolve_x(y, x);
    let y = match options.sign {
        Some(Sign::Positive) => clip(y, Some(0.0), None),
        Some(Sign::Negative) => clip(y, None, Some(0.0)),
        None => y.clone(),
    };

    let area = match options.method {
        IntegrationMethod::Rect => rect(&y, &x, options.rect_step)?,
        IntegrationMethod::Trapz => trapz(&dropna_pairs(&x, &y)),
        IntegrationMethod::Simps => simpson(&dropna_pairs(&x, &y))?,
    };
    debug!(
        samples = y.len(),
        method = %options.method,
        sign = ?options.sign,
        area,
        "integrate"
    );
    Ok(area)
}

fn rect(y: &Series, x: &Series, step: RectStep) -> Result<f64, AnalysisError> {
    let areas = zip_union(y, &diff(x), |y, dx| y * dx)?;
    let post = sum(&areas);
    Ok(match step {
        RectStep::Post => post,
        RectStep::Pre => {
            let held = areas.values().iter().rev().find_map(|a| *a).unwrap_or(0.0);
            post + held
        }
    })
}

/// Trapezoidal rule over `(x, y)` points.
#[must_use]
pub fn trapz(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum()
}

/// Simpson's rule over `(x, y)` points with arbitrary spacing.
///
/// With an odd number of intervals the last one cannot be covered by a parabola, so
/// the result averages a trapezoid on the last interval and one on the first. A
/// decreasing `x` gives a negated area, as with [`trapz`], but two consecutive points
/// at the same `x` leave no parabola to fit.
pub fn simpson(points: &[(f64, f64)]) -> Result<f64, AnalysisError> {
    if let Some(w) = points.windows(2).find(|w| w[1].0 == w[0].0) {
        return Err(AnalysisError::InvalidArgument(format!(
            "Simpson's rule needs distinct consecutive x, got {} twice",
            w[0].0
        )));
    }
    let n = points.len();
    if n < 2 {
        return Ok(0.0);
    }
    if n % 2 == 1 {
        return Ok(simpson_even_intervals(points));
    }
    let head = simpson_even_intervals(&points[..n - 1]) + trapz(&points[n - 2..]);
    let tail = trapz(&points[..2]) + simpson_even_intervals(&points[1..]);
    Ok((head + tail) / 2.0)
}

/// Composite Simpson's rule for an odd number of points.
fn simpson_even_intervals(points: &[(f64, f64)]) -> f64 {
    points
        .windows(3)
        .step_by(2)
        .map(|w| {
            let [(x0, y0), (x1, y1), (x2, y2)] = [w[0], w[1], w[2]];
            let h0 = x1 - x0;
            let h1 = x2 - x1;
            let hsum = h0 + h1;
            let ratio = h0 / h1;
            hsum / 6.0
                * (y0 * (2.0 - 1.0 / ratio) + y1 * hsum * hsum / (h0 * h1) + y2 * (2.0 - ratio))
        })
        .sum()
}
