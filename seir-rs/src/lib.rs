//! Stochastic SEIR simulation and calibration.
//!
//! The crate advances compartmental epidemic models with an Euler-binomial
//! scheme, links latent incidence to reported cases through a measurement
//! model and fits free parameters to a weekly case series using argmin's
//! Nelder-Mead and simulated annealing solvers.
pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod measurement;
pub mod models;
pub mod ode;
pub mod params;
pub mod prelude;
pub mod sampler;
pub mod sim;
pub mod trackers;
pub mod utils;

pub use crate::error::{Error, Result};
pub use crate::sampler::{EulerBinomial, MeanField, TransitionSampler};

/// Discrete time index of an observation. Weekly data uses the week number.
pub type Time = i64;

/// Base Real type used by this crate. Uses an alias to easily change precision
/// if necessary.
pub type Real = f64;
pub(crate) const INF: Real = Real::INFINITY;
pub(crate) const NAN: Real = Real::NAN;
