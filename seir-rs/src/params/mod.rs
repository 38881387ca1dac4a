//! This module declares parameters for the seir crate.
//!
//! Every model exposes its parameters as a plain struct that implements
//! [`ParamSet`]. The trait addresses values by name, which is how the
//! calibration layer maps an optimizer candidate (a flat vector of numbers)
//! back into a concrete parameter struct. Only a chosen subset of names, the
//! [`FreeParam`] list, is ever touched by the optimizer.
mod constants;
mod macros;
mod seir;
mod sir;

pub use constants::*;
pub use seir::*;
pub use sir::*;

use crate::{error::Error, prelude::Real, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

///////////////////////////////////////////////////////////////////////////////
// Basic public traits
///////////////////////////////////////////////////////////////////////////////

/// A set of named scalar parameters.
pub trait ParamSet: Clone + Debug + Send + Sync {
    /// All parameter names, in declaration order.
    const NAMES: &'static [&'static str];

    /// Value of the named parameter.
    fn get(&self, name: &str) -> Option<Real>;

    /// Overwrite the named parameter. Does not validate the new value.
    fn set(&mut self, name: &str, value: Real) -> Result<()>;

    /// Check domain constraints of all parameters.
    fn validate(&self) -> Result<()>;

    /// Values in the order given by NAMES.
    fn values(&self) -> Vec<Real> {
        Self::NAMES.iter().filter_map(|name| self.get(name)).collect()
    }

    /// Return a copy with the given names set to the given values.
    fn with_values(&self, names: &[String], values: &[Real]) -> Result<Self> {
        if names.len() != values.len() {
            return Err(Error::SeriesMismatch {
                expected: names.len(),
                got: values.len(),
            });
        }
        let mut new = self.clone();
        for (name, &value) in names.iter().zip(values) {
            new.set(name, value)?;
        }
        return Ok(new);
    }
}

/// A parameter exposed to the optimizer.
///
/// The initial value defaults to the value found in the base parameter set.
/// Bounds are only used by the global search, which requires both of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeParam {
    pub name: String,
    #[serde(default)]
    pub initial: Option<Real>,
    #[serde(default)]
    pub lower: Option<Real>,
    #[serde(default)]
    pub upper: Option<Real>,
}

impl FreeParam {
    pub fn new(name: &str) -> Self {
        FreeParam {
            name: name.to_string(),
            initial: None,
            lower: None,
            upper: None,
        }
    }

    pub fn bounded(name: &str, lower: Real, upper: Real) -> Self {
        FreeParam {
            lower: Some(lower),
            upper: Some(upper),
            ..Self::new(name)
        }
    }

    pub fn with_initial(mut self, value: Real) -> Self {
        self.initial = Some(value);
        self
    }

    /// Return (lower, upper) if both bounds are set and ordered.
    pub fn bounds(&self) -> Result<(Real, Real)> {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) if lo <= hi && lo.is_finite() && hi.is_finite() => Ok((lo, hi)),
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "bounds of {} are not an ordered finite interval",
                self.name
            ))),
            _ => Err(Error::Config(format!("{} requires lower and upper bounds", self.name))),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
// Validation helpers
///////////////////////////////////////////////////////////////////////////////

/// Rates are finite and non-negative.
pub(crate) fn check_rate(name: &str, value: Real) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(Error::invalid(name, value, "must be a finite non-negative rate"))
}

pub(crate) fn check_positive(name: &str, value: Real) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(Error::invalid(name, value, "must be finite and positive"))
}

/// Probabilities and fractions in (0, 1].
pub(crate) fn check_unit(name: &str, value: Real) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        return Ok(());
    }
    Err(Error::invalid(name, value, "must lie in (0, 1]"))
}
