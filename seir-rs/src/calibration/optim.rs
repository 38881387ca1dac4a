use super::{CostEvaluator, TraceRecord};
use crate::{
    error::Error,
    models::Model,
    prelude::{Real, INF},
    sampler::TransitionSampler,
    trackers::Tracker,
    Result,
};
use argmin::{
    core::{
        CostFunction, Error as ArgminError, Executor, TerminationReason, TerminationStatus,
    },
    solver::{
        neldermead::NelderMead,
        simulatedannealing::{Anneal, SATempFunc, SimulatedAnnealing},
    },
};
use getset::{CopyGetters, Getters};
use log::{info, warn};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};

/// Initial simplex step for coordinates equal to zero.
const ZERO_STEP: Real = 2.5e-4;
/// Relative initial simplex step.
const SIMPLEX_STEP: Real = 0.1;

/// Search method and its budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Strategy {
    NelderMead(LocalSearch),
    Annealing(GlobalSearch),
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::NelderMead(LocalSearch::default())
    }
}

/// Unconstrained Nelder-Mead simplex search from the initial guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearch {
    pub max_iterations: u64,
    /// Stop when the standard deviation of the simplex costs drops below.
    pub sd_tolerance: Real,
}

impl Default for LocalSearch {
    fn default() -> Self {
        LocalSearch {
            max_iterations: 500,
            sd_tolerance: 1e-6,
        }
    }
}

/// Cooling schedule of the simulated annealing. With T0 the initial
/// temperature and j the iteration, the temperature is T0 / (j + 1) for
/// Fast, T0 / ln(j + 1) for Boltzmann and T0 * factor^(j + 1) for
/// Exponential.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cooling {
    #[default]
    Fast,
    Boltzmann,
    Exponential,
}

/// Simulated annealing inside the box given by the free parameter bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSearch {
    pub max_evaluations: u64,
    pub initial_temperature: Real,
    /// The search converged once the schedule cools below this value.
    pub stop_temperature: Real,
    pub cooling: Cooling,
    /// Multiplier of the exponential schedule, in (0, 1).
    pub cooling_factor: Real,
    /// Proposal standard deviation at the initial temperature, as a
    /// fraction of the box width.
    pub step_scale: Real,
    pub seed: u64,
}

impl Default for GlobalSearch {
    fn default() -> Self {
        GlobalSearch {
            max_evaluations: 2_000,
            initial_temperature: 100.0,
            stop_temperature: 1e-2,
            cooling: Cooling::Fast,
            cooling_factor: 0.95,
            step_scale: 0.1,
            seed: 0,
        }
    }
}

impl GlobalSearch {
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(Error::Config(format!(
                "initial temperature must be positive, got {}",
                self.initial_temperature
            )));
        }
        if !(self.stop_temperature >= 0.0) {
            return Err(Error::Config(format!(
                "invalid stop temperature {}",
                self.stop_temperature
            )));
        }
        if self.cooling == Cooling::Exponential
            && !(self.cooling_factor > 0.0 && self.cooling_factor < 1.0)
        {
            return Err(Error::Config(format!(
                "cooling factor must lie in (0, 1), got {}",
                self.cooling_factor
            )));
        }
        if !(self.step_scale.is_finite() && self.step_scale > 0.0) {
            return Err(Error::Config(format!("invalid step scale {}", self.step_scale)));
        }
        Ok(())
    }

    /// Number of iterations after which the schedule is below the stop
    /// temperature. Saturates at u64::MAX.
    pub fn cooling_iterations(&self) -> u64 {
        let (t0, stop) = (self.initial_temperature, self.stop_temperature);
        if stop <= 0.0 {
            return u64::MAX;
        }
        if t0 < stop {
            return 0;
        }
        let ratio = t0 / stop;
        let j = match self.cooling {
            Cooling::Fast => ratio.floor(),
            Cooling::Boltzmann => ratio.exp().floor(),
            Cooling::Exponential => (1.0 / ratio).ln() / self.cooling_factor.ln(),
        };
        // float to int casts saturate
        j.floor() as u64
    }

    fn temp_func(&self) -> SATempFunc<Real> {
        match self.cooling {
            Cooling::Fast => SATempFunc::TemperatureFast,
            Cooling::Boltzmann => SATempFunc::Boltzmann,
            Cooling::Exponential => SATempFunc::Exponential(self.cooling_factor),
        }
    }
}

/// Result of a calibration run.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Calibration<P> {
    /// Full parameter set at the best candidate.
    #[getset(get = "pub")]
    params: P,
    /// Best free parameter values.
    #[getset(get = "pub")]
    candidate: Vec<Real>,
    #[getset(get_copy = "pub")]
    cost: Real,
    #[getset(get_copy = "pub")]
    evaluations: u64,
    #[getset(get_copy = "pub")]
    iterations: u64,
    /// True if the method's own criterion stopped the search at a feasible
    /// candidate, false if the budget ran out or every candidate was
    /// penalized.
    #[getset(get_copy = "pub")]
    converged: bool,
    #[getset(get = "pub")]
    termination: String,
}

/// Bookkeeping shared by the argmin adapter during one search.
///
/// Every cost call goes through the evaluator and is reported to the
/// tracker. Fatal evaluator errors are stashed so they can be returned with
/// their original type once the executor gives up.
struct Search<'a, M: Model, S: TransitionSampler> {
    evaluator: &'a CostEvaluator<M, S>,
    tracker: RefCell<&'a mut dyn Tracker<TraceRecord>>,
    evaluations: Cell<u64>,
    best: RefCell<Option<(Vec<Real>, Real)>>,
    fatal: RefCell<Option<Error>>,
    bounds: Vec<(Real, Real)>,
    rng: RefCell<SmallRng>,
    step_scale: Real,
    initial_temperature: Real,
}

impl<'a, M: Model, S: TransitionSampler + Clone> Search<'a, M, S> {
    fn new(
        evaluator: &'a CostEvaluator<M, S>,
        tracker: &'a mut dyn Tracker<TraceRecord>,
    ) -> Self {
        Search {
            evaluator,
            tracker: RefCell::new(tracker),
            evaluations: Cell::new(0),
            best: RefCell::new(None),
            fatal: RefCell::new(None),
            bounds: vec![],
            rng: RefCell::new(SmallRng::seed_from_u64(0)),
            step_scale: 0.0,
            initial_temperature: 1.0,
        }
    }

    fn for_annealing(mut self, search: &GlobalSearch, bounds: Vec<(Real, Real)>) -> Self {
        self.bounds = bounds;
        self.rng = RefCell::new(SmallRng::seed_from_u64(search.seed.wrapping_add(1)));
        self.step_scale = search.step_scale;
        self.initial_temperature = search.initial_temperature;
        self
    }

    fn evaluate(&self, candidate: &[Real]) -> Result<Real> {
        let cost = self.evaluator.evaluate(candidate)?;
        let iteration = self.evaluations.get();
        self.evaluations.set(iteration + 1);
        let record = TraceRecord {
            iteration,
            params: candidate.to_vec(),
            cost,
        };
        self.tracker.borrow_mut().track(&record);

        let mut best = self.best.borrow_mut();
        let improved = match *best {
            Some((_, c)) => cost < c,
            None => true,
        };
        if improved {
            *best = Some((record.params, cost));
        }
        Ok(cost)
    }

    /// Turn the outcome of the executor into a calibration result.
    fn finish(
        self,
        run: std::result::Result<(u64, TerminationStatus), ArgminError>,
        converged: impl FnOnce(&TerminationStatus) -> bool,
    ) -> Result<Calibration<M::Params>> {
        if let Some(err) = self.fatal.into_inner() {
            return Err(err);
        }
        let (iterations, status) = run.map_err(|e| Error::Optimizer(e.to_string()))?;
        let (candidate, cost) = self
            .best
            .into_inner()
            .ok_or_else(|| Error::Optimizer("no candidate was evaluated".into()))?;
        let params = self.evaluator.params_for(&candidate)?;
        let penalty = self.evaluator.settings().penalty;
        let (converged, termination) = if cost >= penalty {
            (false, format!("no feasible candidate ({:?})", status))
        } else {
            (converged(&status), format!("{:?}", status))
        };
        let evaluations = self.evaluations.get();
        if converged {
            info!("converged after {} evaluations: {}", evaluations, termination);
        } else {
            warn!("search stopped without converging: {}", termination);
        }
        Ok(Calibration {
            params,
            candidate,
            cost,
            evaluations,
            iterations,
            converged,
            termination,
        })
    }
}

/// The problem handed to argmin's executor. It only borrows the search so
/// the bookkeeping survives the run.
struct Problem<'s, 'a, M: Model, S: TransitionSampler>(&'s Search<'a, M, S>);

impl<'s, 'a, M: Model, S: TransitionSampler + Clone> CostFunction for Problem<'s, 'a, M, S> {
    type Param = Vec<Real>;
    type Output = Real;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Real, ArgminError> {
        let search = self.0;
        if search.fatal.borrow().is_some() {
            return Err(ArgminError::msg("evaluation aborted"));
        }
        search.evaluate(param).map_err(|e| {
            let msg = e.to_string();
            *search.fatal.borrow_mut() = Some(e);
            ArgminError::msg(msg)
        })
    }
}

impl<'s, 'a, M: Model, S: TransitionSampler + Clone> Anneal for Problem<'s, 'a, M, S> {
    type Param = Vec<Real>;
    type Output = Vec<Real>;
    type Float = Real;

    /// Gaussian move with standard deviation proportional to the box width
    /// and to the current temperature, clamped into the box.
    fn anneal(
        &self,
        param: &Self::Param,
        temp: Real,
    ) -> std::result::Result<Vec<Real>, ArgminError> {
        let search = self.0;
        let mut rng = search.rng.borrow_mut();
        let heat = (temp / search.initial_temperature).clamp(0.0, 1.0);
        let next = param
            .iter()
            .zip(&search.bounds)
            .map(|(&x, &(lo, hi))| {
                let z: Real = rng.sample(StandardNormal);
                (x + z * search.step_scale * (hi - lo) * heat).clamp(lo, hi)
            })
            .collect();
        Ok(next)
    }
}

/// Minimize the evaluator's objective with the given strategy.
///
/// The tracker receives one record per objective evaluation, in call order.
/// A zero budget returns the initial guess without evaluating it.
pub fn calibrate<M, S>(
    evaluator: &CostEvaluator<M, S>,
    strategy: &Strategy,
    tracker: &mut dyn Tracker<TraceRecord>,
) -> Result<Calibration<M::Params>>
where
    M: Model,
    S: TransitionSampler + Clone,
{
    let init = evaluator.initial_guess();
    info!("calibrating {:?} from {:?}", evaluator.names(), init);
    match strategy {
        Strategy::NelderMead(search) => nelder_mead(evaluator, search, init, tracker),
        Strategy::Annealing(search) => annealing(evaluator, search, init, tracker),
    }
}

fn nelder_mead<M, S>(
    evaluator: &CostEvaluator<M, S>,
    search: &LocalSearch,
    init: Vec<Real>,
    tracker: &mut dyn Tracker<TraceRecord>,
) -> Result<Calibration<M::Params>>
where
    M: Model,
    S: TransitionSampler + Clone,
{
    if search.max_iterations == 0 {
        return unevaluated(evaluator, init);
    }
    let solver = NelderMead::new(simplex(&init))
        .with_sd_tolerance(search.sd_tolerance)
        .map_err(|e| Error::Config(format!("sd_tolerance: {}", e)))?;

    let bookkeeping = Search::new(evaluator, tracker);
    let run = Executor::new(Problem(&bookkeeping), solver)
        .configure(|state| state.max_iters(search.max_iterations))
        .run()
        .map(|res| {
            let state = res.state();
            (state.iter, state.termination_status.clone())
        });
    bookkeeping.finish(run, |status| {
        matches!(
            status,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        )
    })
}

fn annealing<M, S>(
    evaluator: &CostEvaluator<M, S>,
    search: &GlobalSearch,
    init: Vec<Real>,
    tracker: &mut dyn Tracker<TraceRecord>,
) -> Result<Calibration<M::Params>>
where
    M: Model,
    S: TransitionSampler + Clone,
{
    search.validate()?;
    let bounds = evaluator.bounds()?;
    let init: Vec<Real> = init
        .iter()
        .zip(&bounds)
        .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
        .collect();
    if search.max_evaluations == 0 {
        return unevaluated(evaluator, init);
    }

    // The executor evaluates the initial point once, then one candidate per
    // iteration.
    let budget = search.max_evaluations - 1;
    let cooling = search.cooling_iterations();
    let max_iters = budget.min(cooling);
    let solver = SimulatedAnnealing::new_with_rng(
        search.initial_temperature,
        Xoshiro256PlusPlus::seed_from_u64(search.seed),
    )
    .map_err(|e| Error::Config(format!("initial temperature: {}", e)))?
    .with_temp_func(search.temp_func());

    let bookkeeping = Search::new(evaluator, tracker).for_annealing(search, bounds);
    let run = Executor::new(Problem(&bookkeeping), solver)
        .configure(|state| state.param(init).max_iters(max_iters))
        .run()
        .map(|res| {
            let state = res.state();
            (state.iter, state.termination_status.clone())
        });
    bookkeeping.finish(run, |_| cooling <= budget)
}

/// Result for a search that was not allowed to evaluate anything.
fn unevaluated<M, S>(
    evaluator: &CostEvaluator<M, S>,
    init: Vec<Real>,
) -> Result<Calibration<M::Params>>
where
    M: Model,
    S: TransitionSampler + Clone,
{
    warn!("zero evaluation budget, returning the initial guess");
    Ok(Calibration {
        params: evaluator.params_for(&init)?,
        candidate: init,
        cost: INF,
        evaluations: 0,
        iterations: 0,
        converged: false,
        termination: "no evaluation budget".to_string(),
    })
}

/// Initial simplex: the guess plus one vertex per coordinate moved by 10%
/// (or by a small absolute step for zeros).
fn simplex(init: &[Real]) -> Vec<Vec<Real>> {
    let mut vertices = vec![init.to_vec()];
    for i in 0..init.len() {
        let mut vertex = init.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * (1.0 + SIMPLEX_STEP)
        } else {
            ZERO_STEP
        };
        vertices.push(vertex);
    }
    return vertices;
}
