//! Operators over stepped trace signals.
//!
//! Every operator is a pure function from validated [`Series`] or [`Table`] values to
//! fresh ones, returning an [`AnalysisError`] for input it cannot handle.
pub mod align;
pub mod config;
pub mod derivative;
pub mod integrate;
pub mod logs;
pub mod mean;
pub mod merge;
pub mod series_ops;
pub mod squash;
pub mod window;

pub use stepwise_types::{AnalysisError, Series, Table, TimeIndexed, Value};

pub use crate::align::{Alignment, align};
pub use crate::config::AnalysisConfig;
pub use crate::derivative::derivative;
pub use crate::integrate::{IntegrateOptions, IntegrationMethod, RectStep, Sign, integrate};
pub use crate::mean::mean;
pub use crate::merge::{MergeOptions, merge, merge_in_place};
pub use crate::squash::squash;
pub use crate::window::{WindowPolicy, select};
