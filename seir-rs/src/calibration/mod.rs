//! Fitting free parameters of a model to an observed series.
//!
//! The [`CostEvaluator`] turns a candidate vector into a scalar cost by
//! simulating the model with the candidate parameters. [`calibrate`] drives
//! one of argmin's solvers over that cost, reporting every evaluation to a
//! [`Tracker`](crate::trackers::Tracker) such as [`Trace`].
mod cost;
mod optim;
mod trace;

pub use cost::*;
pub use optim::*;
pub use trace::*;
