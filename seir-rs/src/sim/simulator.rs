use super::TimeGrid;
use crate::{
    data::ObservationSeries,
    error::Error,
    measurement::Measurement,
    models::Model,
    prelude::{Real, Time},
    sampler::{EulerBinomial, TransitionSampler},
    Result,
};
use log::trace;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Output of the simulator at a reporting time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Snapshot<S> {
    /// Observation index.
    pub time: Time,
    pub state: S,
    /// Flow accumulated since the previous reporting time.
    pub accumulated: Real,
}

/// Runs a model over a time grid.
///
/// The simulator itself is immutable. Every call to [`Simulator::trajectory`]
/// starts a fresh run from the initial state of the model, so the same
/// parameters and the same seed always produce the same path.
#[derive(Debug, Clone)]
pub struct Simulator<M: Model, S: TransitionSampler = EulerBinomial> {
    model: M,
    grid: TimeGrid,
    sampler: S,
}

impl<M: Model> Simulator<M> {
    pub fn new(model: M, grid: TimeGrid) -> Self {
        Simulator {
            model,
            grid,
            sampler: EulerBinomial,
        }
    }
}

impl<M: Model, S: TransitionSampler> Simulator<M, S> {
    /// Replace the transition sampler.
    pub fn with_sampler<S2: TransitionSampler>(self, sampler: S2) -> Simulator<M, S2> {
        Simulator {
            model: self.model,
            grid: self.grid,
            sampler,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Same simulator with a different model.
    pub fn with_model(&self, model: M) -> Self
    where
        S: Clone,
    {
        Simulator {
            model,
            grid: self.grid,
            sampler: self.sampler.clone(),
        }
    }

    /// Lazy iterator of snapshots, one per reporting time.
    ///
    /// Times must be strictly increasing. The iterator stops after yielding
    /// the first error.
    pub fn trajectory<'a, R: Rng>(
        &'a self,
        times: &'a [Time],
        rng: R,
    ) -> Result<Trajectory<'a, M, S, R>> {
        self.grid.validate()?;
        check_increasing(times)?;
        let clock = match times.first() {
            Some(&first) => self.grid.start(first)?,
            None => 0.0,
        };
        Ok(Trajectory {
            sim: self,
            times,
            pos: 0,
            clock,
            state: self.model.initial_state(),
            rng,
            done: false,
        })
    }

    /// Collect a full run seeded with the given value.
    pub fn simulate(&self, times: &[Time], seed: u64) -> Result<Vec<Snapshot<M::State>>> {
        self.trajectory(times, SmallRng::seed_from_u64(seed))?
            .collect()
    }

    /// Simulate reported counts at the given times.
    ///
    /// Runs the trajectory and draws each report from the measurement model
    /// with the same random stream.
    pub fn reports(&self, times: &[Time], rng: &mut impl Rng) -> Result<ObservationSeries> {
        let measure = self.model.measurement();
        let latent = self
            .trajectory(times, &mut *rng)?
            .map(|s| s.map(|s| s.accumulated))
            .collect::<Result<Vec<_>>>()?;
        let reported = latent
            .into_iter()
            .map(|latent| measure.sample(latent, rng))
            .collect::<Result<Vec<_>>>()?;
        ObservationSeries::new(times.to_vec(), reported)
    }

    /// Expected reports along a single run: rho times the accumulated flow.
    pub fn expected_reports(&self, times: &[Time], seed: u64) -> Result<ObservationSeries> {
        let measure = self.model.measurement();
        let cases = self
            .simulate(times, seed)?
            .iter()
            .map(|s| measure.expected(s.accumulated))
            .collect();
        ObservationSeries::new(times.to_vec(), cases)
    }
}

fn check_increasing(times: &[Time]) -> Result<()> {
    for (index, pair) in times.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(Error::NonMonotonic {
                index: index + 1,
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

/// A single run of the simulator. Created by [`Simulator::trajectory`].
pub struct Trajectory<'a, M: Model, S: TransitionSampler, R: Rng> {
    sim: &'a Simulator<M, S>,
    times: &'a [Time],
    pos: usize,
    clock: Real,
    state: M::State,
    rng: R,
    done: bool,
}

impl<'a, M: Model, S: TransitionSampler, R: Rng> Trajectory<'a, M, S, R> {
    /// Current compartment state.
    pub fn state(&self) -> &M::State {
        &self.state
    }

    /// Current model time.
    pub fn clock(&self) -> Real {
        self.clock
    }

    fn advance(&mut self, time: Time) -> Result<Snapshot<M::State>> {
        let grid = &self.sim.grid;
        let target = grid.model_time(time);
        let n = grid.steps(self.clock, target);
        let mut accumulated = 0.0;
        if n > 0 {
            let h = (target - self.clock) / n as Real;
            for _ in 0..n {
                accumulated +=
                    self.sim
                        .model
                        .step(&mut self.state, h, &self.sim.sampler, &mut self.rng)?;
            }
        }
        self.clock = target;
        trace!("t={}, state={:?}, acc={}", time, self.state, accumulated);
        return Ok(Snapshot {
            time,
            state: self.state,
            accumulated,
        });
    }
}

impl<'a, M: Model, S: TransitionSampler, R: Rng> Iterator for Trajectory<'a, M, S, R> {
    type Item = Result<Snapshot<M::State>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.times.len() {
            return None;
        }
        let time = self.times[self.pos];
        self.pos += 1;
        let result = self.advance(time);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, Some(self.times.len() - self.pos))
    }
}
