use crate::{
    error::Error, measurement::Measurement, params::ParamSet, prelude::Real,
    sampler::TransitionSampler, Result,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod seir;
pub mod sir;
pub use seir::*;
pub use sir::*;

/// A compartmental state: a fixed set of labelled, non-negative counts.
pub trait CompartmentState: Copy + Debug + PartialEq + Send + Sync {
    const LABELS: &'static [&'static str];
    const CSV_HEADER: &'static str;

    /// Counts in the order given by LABELS.
    fn to_vec(&self) -> Vec<Real>;

    /// Sum of all compartments.
    fn total(&self) -> Real {
        self.to_vec().iter().sum()
    }

    /// Fail if any compartment is negative or not finite.
    fn check(&self) -> Result<()> {
        for (label, x) in Self::LABELS.iter().zip(self.to_vec()) {
            if !(x.is_finite() && x >= 0.0) {
                return Err(Error::Infeasible(format!("{} = {}", label, x)));
            }
        }
        Ok(())
    }
}

/// Which transition is accumulated between two reporting times. The
/// accumulated count is what the measurement model sees.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// New infections, S -> E (S -> I in models without latency).
    Exposure,
    /// New infectious cases, E -> I (same as Exposure without latency).
    Onset,
    /// Removals, I -> R.
    Removal,
}

/// The transition model consumed by the simulator.
///
/// A model owns a validated parameter set, knows how to initialize its state
/// and how to advance it by one micro-step. It also provides the measurement
/// model that turns accumulated flows into reported counts.
pub trait Model: Clone + Debug + Send + Sync {
    type Params: ParamSet;
    type State: CompartmentState;
    type Measure: Measurement;

    fn params(&self) -> &Self::Params;

    /// Return a copy of the model using the given parameters. Parameters are
    /// validated before the model is built.
    fn with_params(&self, params: Self::Params) -> Result<Self>;

    fn initial_state(&self) -> Self::State;

    /// Advance state by dt drawing every transition with the given sampler.
    ///
    /// Return the increment of the accumulated flow.
    fn step<S: TransitionSampler>(
        &self,
        state: &mut Self::State,
        dt: Real,
        sampler: &S,
        rng: &mut impl Rng,
    ) -> Result<Real>;

    fn measurement(&self) -> Self::Measure;
}
