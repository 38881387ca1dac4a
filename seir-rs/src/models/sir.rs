use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{CompartmentState, Flow, Model};
use crate::{
    measurement::{Reporting, ReportingFamily},
    params::{ParamSet, SirParams},
    prelude::Real,
    sampler::TransitionSampler,
    Result,
};

/// Counts in the Susceptible, Infectious and Removed compartments.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SirState {
    pub s: Real,
    pub i: Real,
    pub r: Real,
}

impl CompartmentState for SirState {
    const LABELS: &'static [&'static str] = &["S", "I", "R"];
    const CSV_HEADER: &'static str = "S,I,R";

    fn to_vec(&self) -> Vec<Real> {
        vec![self.s, self.i, self.r]
    }
}

/// Two-compartment model used for the exploratory fits. Only a fraction
/// eta of the population is susceptible, the remainder starts removed, and
/// reports are drawn from the removals.
#[derive(Debug, Clone, PartialEq)]
pub struct SirModel {
    params: SirParams,
    flow: Flow,
    reporting: ReportingFamily,
}

impl SirModel {
    pub fn new(params: SirParams) -> Result<Self> {
        params.validate()?;
        Ok(SirModel {
            params,
            flow: Flow::Removal,
            reporting: ReportingFamily::NegativeBinomial,
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
}

impl Model for SirModel {
    type Params = SirParams;
    type State = SirState;
    type Measure = Reporting;

    fn params(&self) -> &SirParams {
        &self.params
    }

    fn with_params(&self, params: SirParams) -> Result<Self> {
        params.validate()?;
        Ok(SirModel {
            params,
            ..self.clone()
        })
    }

    fn initial_state(&self) -> SirState {
        let s = self.params.initial_susceptible();
        SirState {
            s,
            i: 1.0,
            r: self.params.pop() - s - 1.0,
        }
    }

    fn step<S: TransitionSampler>(
        &self,
        state: &mut SirState,
        dt: Real,
        sampler: &S,
        rng: &mut impl Rng,
    ) -> Result<Real> {
        let p = &self.params;
        let d_si = sampler.transitions(state.s, p.beta() * state.i / p.pop(), dt, rng)?;
        let d_ir = sampler.transitions(state.i, p.mu_ir(), dt, rng)?;

        state.s -= d_si;
        state.i += d_si - d_ir;
        state.r += d_ir;
        state.check()?;

        return Ok(match self.flow {
            Flow::Exposure | Flow::Onset => d_si,
            Flow::Removal => d_ir,
        });
    }

    fn measurement(&self) -> Reporting {
        Reporting::new(self.reporting, self.params.rho(), self.params.k())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::EulerBinomial;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn initial_state_splits_population() {
        let m = SirModel::new(SirParams::default().with_pop(1_000.0).with_eta(0.2)).unwrap();
        let st = m.initial_state();
        assert_eq!(st, SirState { s: 199.0, i: 1.0, r: 800.0 });
    }

    #[test]
    fn steps_preserve_population() {
        let params = SirParams::default()
            .with_pop(2_000.0)
            .with_eta(0.5)
            .with_beta(1.5)
            .with_mu_ir(0.5);
        let m = SirModel::new(params).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut st = m.initial_state();
        let mut removed = 0.0;
        for _ in 0..200 {
            removed += m.step(&mut st, 0.1, &EulerBinomial, &mut rng).unwrap();
            assert_eq!(st.total(), 2_000.0);
        }
        assert_eq!(removed, st.r - 1_000.0);
    }

    #[test]
    fn default_reporting_is_overdispersed() {
        let m = SirModel::new(SirParams::default()).unwrap();
        assert!(matches!(m.measurement(), Reporting::NegativeBinomial { .. }));
    }
}
