use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{CompartmentState, Flow, Model};
use crate::{
    measurement::{Reporting, ReportingFamily},
    params::{ParamSet, SeirParams},
    prelude::Real,
    sampler::TransitionSampler,
    Result,
};

/// Counts in the Susceptible, Exposed, Infectious and Recovered compartments.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeirState {
    pub s: Real,
    pub e: Real,
    pub i: Real,
    pub r: Real,
}

impl SeirState {
    pub fn new(s: Real, e: Real, i: Real, r: Real) -> Self {
        SeirState { s, e, i, r }
    }
}

impl CompartmentState for SeirState {
    const LABELS: &'static [&'static str] = &["S", "E", "I", "R"];
    const CSV_HEADER: &'static str = "S,E,I,R";

    fn to_vec(&self) -> Vec<Real> {
        vec![self.s, self.e, self.i, self.r]
    }
}

/// Stochastic SEIR model.
///
/// Each micro-step draws S -> E with rate beta * I / N, E -> I with rate
/// sigma and I -> R with rate gamma, all evaluated at the state of the
/// beginning of the step, and applies them by conservation.
#[derive(Debug, Clone, PartialEq)]
pub struct SeirModel {
    params: SeirParams,
    flow: Flow,
    reporting: ReportingFamily,
}

impl SeirModel {
    /// Create a model reporting new infectious cases with binomial
    /// thinning.
    pub fn new(params: SeirParams) -> Result<Self> {
        params.validate()?;
        Ok(SeirModel {
            params,
            flow: Flow::Onset,
            reporting: ReportingFamily::Binomial,
        })
    }

    pub fn with_flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_reporting(mut self, reporting: ReportingFamily) -> Self {
        self.reporting = reporting;
        self
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }
}

impl Model for SeirModel {
    type Params = SeirParams;
    type State = SeirState;
    type Measure = Reporting;

    fn params(&self) -> &SeirParams {
        &self.params
    }

    fn with_params(&self, params: SeirParams) -> Result<Self> {
        params.validate()?;
        Ok(SeirModel {
            params,
            ..self.clone()
        })
    }

    fn initial_state(&self) -> SeirState {
        let p = &self.params;
        SeirState::new(p.pop - p.e0 - p.i0, p.e0, p.i0, 0.0)
    }

    fn step<S: TransitionSampler>(
        &self,
        state: &mut SeirState,
        dt: Real,
        sampler: &S,
        rng: &mut impl Rng,
    ) -> Result<Real> {
        let p = &self.params;
        let force = p.beta * state.i / p.pop;
        let d_se = sampler.transitions(state.s, force, dt, rng)?;
        let d_ei = sampler.transitions(state.e, p.sigma, dt, rng)?;
        let d_ir = sampler.transitions(state.i, p.gamma, dt, rng)?;

        state.s -= d_se;
        state.e += d_se - d_ei;
        state.i += d_ei - d_ir;
        state.r += d_ir;
        state.check()?;

        return Ok(match self.flow {
            Flow::Exposure => d_se,
            Flow::Onset => d_ei,
            Flow::Removal => d_ir,
        });
    }

    fn measurement(&self) -> Reporting {
        Reporting::new(self.reporting, self.params.rho(), self.params.k())
    }
}
