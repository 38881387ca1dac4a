use crate::{
    data::ObservationSeries,
    error::Error,
    measurement::Measurement,
    models::Model,
    params::{FreeParam, ParamSet, PENALTY},
    prelude::{Real, Time},
    sampler::{EulerBinomial, TransitionSampler},
    sim::Simulator,
    Result,
};
use log::{debug, warn};
use rand::{rngs::SmallRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Scalar objective minimized by the optimizers. Lower is better for both.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Sum of squared residuals between observed and simulated reports,
    /// averaged over replicates.
    #[default]
    SumSquares,
    /// Minus the log of the Monte Carlo likelihood. Replicate likelihoods
    /// are averaged on the natural scale.
    NegLogLik,
}

/// How replicate random streams are seeded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seeding {
    /// Replicate r always uses `seed + r`. The objective is a deterministic
    /// function of the candidate (common random numbers).
    #[default]
    Common,
    /// Replicate r of the c-th evaluation uses
    /// `splitmix64(splitmix64(seed ^ c) + r)`, giving fresh noise on every
    /// call while staying reproducible for a given call sequence.
    PerCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    pub objective: Objective,
    /// Monte Carlo replicates per evaluation.
    pub replicates: usize,
    pub seed: u64,
    pub seeding: Seeding,
    /// Cost assigned to infeasible candidates.
    pub penalty: Real,
    /// Evaluate replicates in parallel.
    pub parallel: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        EvalSettings {
            objective: Objective::SumSquares,
            replicates: 1,
            seed: 42,
            seeding: Seeding::Common,
            penalty: PENALTY,
            parallel: false,
        }
    }
}

/// Maps a candidate vector of free parameter values to a cost.
///
/// The evaluator owns the simulator template, the observed series and the
/// list of free parameters. Candidates that violate parameter domains or
/// drive the simulation into an infeasible state get the penalty cost; any
/// other failure is returned as an error and aborts the search.
#[derive(Debug)]
pub struct CostEvaluator<M: Model, S: TransitionSampler = EulerBinomial> {
    simulator: Simulator<M, S>,
    observed: ObservationSeries,
    free: Vec<FreeParam>,
    names: Vec<String>,
    settings: EvalSettings,
    calls: AtomicU64,
}

impl<M: Model, S: TransitionSampler + Clone> CostEvaluator<M, S> {
    /// Check the base parameters, free parameter names and settings.
    pub fn new(
        simulator: Simulator<M, S>,
        observed: ObservationSeries,
        free: Vec<FreeParam>,
        settings: EvalSettings,
    ) -> Result<Self> {
        simulator.model().params().validate()?;
        simulator.grid().validate()?;
        if free.is_empty() {
            return Err(Error::Config("no free parameters".into()));
        }
        for param in &free {
            if !<M::Params as ParamSet>::NAMES.contains(&param.name.as_str()) {
                return Err(Error::UnknownParameter(param.name.clone()));
            }
        }
        if settings.replicates == 0 {
            return Err(Error::Config("replicates must be at least 1".into()));
        }
        if !settings.penalty.is_finite() {
            return Err(Error::Config(format!("penalty must be finite, got {}", settings.penalty)));
        }
        if settings.objective == Objective::NegLogLik {
            // the likelihood of a negative or fractional count is zero everywhere
            let bad = observed
                .cases()
                .iter()
                .position(|&y| y < 0.0 || y.fract() != 0.0);
            if let Some(index) = bad {
                return Err(Error::InvalidCount {
                    index,
                    value: observed.cases()[index],
                });
            }
        }
        let names = free.iter().map(|p| p.name.clone()).collect();
        Ok(CostEvaluator {
            simulator,
            observed,
            free,
            names,
            settings,
            calls: AtomicU64::new(0),
        })
    }

    pub fn simulator(&self) -> &Simulator<M, S> {
        &self.simulator
    }

    pub fn observed(&self) -> &ObservationSeries {
        &self.observed
    }

    pub fn free(&self) -> &[FreeParam] {
        &self.free
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn settings(&self) -> &EvalSettings {
        &self.settings
    }

    /// Number of evaluations so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Reset the evaluation counter. With `Seeding::PerCall` this replays the
    /// same sequence of random streams.
    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }

    /// Starting point: explicit initial values or the base parameter values.
    pub fn initial_guess(&self) -> Vec<Real> {
        let base = self.simulator.model().params();
        self.free
            .iter()
            .map(|p| p.initial.or_else(|| base.get(&p.name)).unwrap_or(0.0))
            .collect()
    }

    pub fn bounds(&self) -> Result<Vec<(Real, Real)>> {
        self.free.iter().map(|p| p.bounds()).collect()
    }

    /// Base parameters with the free values replaced by the candidate.
    pub fn params_for(&self, candidate: &[Real]) -> Result<M::Params> {
        self.simulator
            .model()
            .params()
            .with_values(&self.names, candidate)
    }

    /// Cost of a candidate. Infeasible candidates cost the penalty.
    pub fn evaluate(&self, candidate: &[Real]) -> Result<Real> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let result = self
            .params_for(candidate)
            .and_then(|params| self.cost_of(&params, call));
        match result {
            Ok(cost) if cost.is_finite() => {
                debug!("eval {}: {:?} -> {}", call, candidate, cost);
                Ok(cost)
            }
            Ok(cost) => {
                warn!("eval {}: non finite cost {} for {:?}", call, cost, candidate);
                Ok(self.settings.penalty)
            }
            Err(e) if e.is_infeasible() => {
                debug!("eval {}: penalized {:?}: {}", call, candidate, e);
                Ok(self.settings.penalty)
            }
            Err(e) => Err(e),
        }
    }

    /// Cost of a full parameter set for the given evaluation index.
    pub fn cost_of(&self, params: &M::Params, call: u64) -> Result<Real> {
        let model = self.simulator.model().with_params(params.clone())?;
        let sim = self.simulator.with_model(model);
        let seeds: Vec<u64> = (0..self.settings.replicates as u64)
            .map(|r| self.seed_for(call, r))
            .collect();
        let run = |&seed: &u64| self.replicate(&sim, seed);
        let values = if self.settings.parallel {
            seeds.par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            seeds.iter().map(run).collect::<Result<Vec<_>>>()?
        };

        return Ok(match self.settings.objective {
            Objective::SumSquares => values.iter().sum::<Real>() / values.len() as Real,
            Objective::NegLogLik => {
                let ll = log_mean_exp(&values);
                if ll == Real::NEG_INFINITY {
                    return Err(Error::Infeasible("zero likelihood".into()));
                }
                -ll
            }
        });
    }

    /// Seed of replicate r in the given evaluation.
    pub fn seed_for(&self, call: u64, replicate: u64) -> u64 {
        let seed = self.settings.seed;
        match self.settings.seeding {
            Seeding::Common => seed.wrapping_add(replicate),
            Seeding::PerCall => splitmix64(splitmix64(seed ^ call).wrapping_add(replicate)),
        }
    }

    /// SSE or log-likelihood of a single replicate.
    fn replicate(&self, sim: &Simulator<M, S>, seed: u64) -> Result<Real> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let times: &[Time] = self.observed.times();
        match self.settings.objective {
            Objective::SumSquares => {
                let simulated = sim.reports(times, &mut rng)?;
                sum_squares(&self.observed, &simulated)
            }
            Objective::NegLogLik => {
                let measure = sim.model().measurement();
                let mut ll = 0.0;
                for (snapshot, &y) in sim.trajectory(times, rng)?.zip(self.observed.cases()) {
                    ll += measure.log_density(y, snapshot?.accumulated);
                }
                Ok(ll)
            }
        }
    }

    /// Simulated reports at the observed times for a candidate, using the
    /// first replicate seed.
    pub fn simulate_fit(&self, candidate: &[Real]) -> Result<ObservationSeries> {
        let model = self
            .simulator
            .model()
            .with_params(self.params_for(candidate)?)?;
        let mut rng = SmallRng::seed_from_u64(self.seed_for(0, 0));
        self.simulator
            .with_model(model)
            .reports(self.observed.times(), &mut rng)
    }
}

/// Sum of squared residuals. Both series must share time stamps.
pub fn sum_squares(observed: &ObservationSeries, simulated: &ObservationSeries) -> Result<Real> {
    observed.check_aligned(simulated)?;
    let sse = observed
        .cases()
        .iter()
        .zip(simulated.cases())
        .map(|(y, x)| (y - x).powi(2))
        .sum();
    return Ok(sse);
}

/// log(mean(exp(xs))) computed without overflow.
pub fn log_mean_exp(xs: &[Real]) -> Real {
    let max = xs.iter().cloned().fold(Real::NEG_INFINITY, Real::max);
    if !max.is_finite() {
        return max;
    }
    let mean = xs.iter().map(|x| (x - max).exp()).sum::<Real>() / xs.len() as Real;
    max + mean.ln()
}

/// SplitMix64 finalizer.
pub fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::SeirModel,
        params::SeirParams,
        sim::TimeGrid,
    };
    use assert_approx_eq::assert_approx_eq;

    fn evaluator(settings: EvalSettings) -> CostEvaluator<SeirModel> {
        let params = SeirParams::new(0.5, 0.3, 0.2, 10_000.0, 0.5).with_i0(20.0);
        let sim = Simulator::new(SeirModel::new(params).unwrap(), TimeGrid::default());
        let observed = ObservationSeries::from_counts(vec![5.0, 12.0, 30.0, 41.0]).unwrap();
        CostEvaluator::new(sim, observed, vec![FreeParam::new("beta")], settings).unwrap()
    }

    #[test]
    fn pinned_seed_is_deterministic() {
        let ev = evaluator(EvalSettings {
            replicates: 3,
            ..EvalSettings::default()
        });
        let a = ev.evaluate(&[0.6]).unwrap();
        let b = ev.evaluate(&[0.6]).unwrap();
        assert_eq!(a, b);
        assert_eq!(ev.calls(), 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let settings = EvalSettings {
            replicates: 4,
            objective: Objective::NegLogLik,
            ..EvalSettings::default()
        };
        let seq = evaluator(settings.clone());
        let par = evaluator(EvalSettings {
            parallel: true,
            ..settings
        });
        assert_eq!(seq.evaluate(&[0.4]).unwrap(), par.evaluate(&[0.4]).unwrap());
    }

    #[test]
    fn per_call_seeding_changes_streams() {
        let ev = evaluator(EvalSettings {
            seeding: Seeding::PerCall,
            ..EvalSettings::default()
        });
        assert_ne!(ev.seed_for(0, 0), ev.seed_for(1, 0));
        assert_ne!(ev.seed_for(0, 0), ev.seed_for(0, 1));
        let first = ev.evaluate(&[0.6]).unwrap();
        ev.reset_calls();
        assert_eq!(ev.evaluate(&[0.6]).unwrap(), first);
    }

    #[test]
    fn infeasible_candidates_are_penalized() {
        let ev = evaluator(EvalSettings::default());
        assert_eq!(ev.evaluate(&[-1.0]).unwrap(), PENALTY);
        assert_eq!(ev.evaluate(&[Real::NAN]).unwrap(), PENALTY);
    }

    #[test]
    fn wrong_candidate_length_is_fatal() {
        let ev = evaluator(EvalSettings::default());
        assert!(matches!(ev.evaluate(&[0.1, 0.2]), Err(Error::SeriesMismatch { .. })));
    }

    #[test]
    fn rejects_invalid_setup() {
        let sim = Simulator::new(
            SeirModel::new(SeirParams::default()).unwrap(),
            TimeGrid::default(),
        );
        let observed = ObservationSeries::from_counts(vec![1.0]).unwrap();
        let unknown = CostEvaluator::new(
            sim.clone(),
            observed.clone(),
            vec![FreeParam::new("delta")],
            EvalSettings::default(),
        );
        assert!(matches!(unknown, Err(Error::UnknownParameter(_))));
        let no_reps = CostEvaluator::new(
            sim,
            observed,
            vec![FreeParam::new("beta")],
            EvalSettings {
                replicates: 0,
                ..EvalSettings::default()
            },
        );
        assert!(no_reps.is_err());
    }

    #[test]
    fn likelihood_requires_counts() {
        let sim = Simulator::new(
            SeirModel::new(SeirParams::default()).unwrap(),
            TimeGrid::default(),
        );
        let likelihood = EvalSettings {
            objective: Objective::NegLogLik,
            ..EvalSettings::default()
        };
        let free = vec![FreeParam::new("beta")];
        let check = |cases: Vec<Real>, settings: &EvalSettings| {
            let observed = ObservationSeries::from_counts(cases).unwrap();
            CostEvaluator::new(sim.clone(), observed, free.clone(), settings.clone())
        };

        let negative = check(vec![30.0, -5.0, 35.0], &likelihood);
        assert!(matches!(negative, Err(Error::InvalidCount { index: 1, .. })));
        let fractional = check(vec![30.0, 5.0, 2.5], &likelihood);
        assert!(matches!(fractional, Err(Error::InvalidCount { index: 2, .. })));
        assert!(check(vec![30.0, 0.0, 35.0], &likelihood).is_ok());
        assert!(check(vec![30.0, -5.0, 35.0], &EvalSettings::default()).is_ok());
    }

    #[test]
    fn sum_squares_checks_alignment() {
        let a = ObservationSeries::from_counts(vec![1.0, 2.0]).unwrap();
        let b = ObservationSeries::from_counts(vec![2.0, 4.0]).unwrap();
        assert_eq!(sum_squares(&a, &b).unwrap(), 5.0);
        let c = ObservationSeries::new(vec![1, 3], vec![1.0, 2.0]).unwrap();
        assert!(matches!(sum_squares(&a, &c), Err(Error::TimeMismatch { .. })));
    }

    #[test]
    fn log_mean_exp_is_stable() {
        assert_approx_eq!(log_mean_exp(&[-1000.0, -1000.0]), -1000.0, 1e-12);
        assert_approx_eq!(log_mean_exp(&[0.0, (3.0 as Real).ln()]), (2.0 as Real).ln(), 1e-12);
        assert_eq!(log_mean_exp(&[Real::NEG_INFINITY; 2]), Real::NEG_INFINITY);
    }
}
