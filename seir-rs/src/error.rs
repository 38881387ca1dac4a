//! Error types shared by the simulator, the evaluator and the optimizers.

use crate::{Real, Time};
use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A parameter lies outside of its valid domain.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: Real,
        reason: &'static str,
    },

    /// Name does not belong to the parameter set.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Simulation reached a state that cannot be represented (negative or
    /// non-finite compartment).
    #[error("infeasible simulation: {0}")]
    Infeasible(String),

    #[error("observation series is empty")]
    EmptySeries,

    #[error("time index must be strictly increasing: {prev} followed by {next} at position {index}")]
    NonMonotonic { index: usize, prev: Time, next: Time },

    #[error("series mismatch: expected {expected} points, got {got}")]
    SeriesMismatch { expected: usize, got: usize },

    #[error("time stamps differ at position {index}: {expected} != {got}")]
    TimeMismatch {
        index: usize,
        expected: Time,
        got: Time,
    },

    #[error("invalid count at position {index}: {value}")]
    InvalidCount { index: usize, value: Real },

    /// Configuration is readable but inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("optimizer failed: {0}")]
    Optimizer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand used by parameter validation.
    pub(crate) fn invalid(name: &str, value: Real, reason: &'static str) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            value,
            reason,
        }
    }

    /// True for errors signalling that a parameter vector is not admissible.
    /// The evaluator converts those into a penalty cost.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Error::InvalidParameter { .. } | Error::Infeasible(_))
    }
}
