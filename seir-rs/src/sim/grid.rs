use crate::{
    error::Error,
    params::{DAYS_PER_WEEK, STEP_SIZE},
    prelude::{Real, Time},
    Result,
};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Upper limit on micro-steps per period.
pub const MAX_STEPS_PER_PERIOD: Real = 1e6;

/// Maps observation indices to model time and splits reporting intervals
/// into micro-steps.
///
/// Observation index t corresponds to model time `t * period`. Between two
/// consecutive reporting times the simulator takes `ceil(interval / dt)` equal
/// steps, so the effective step never exceeds dt and reporting times are hit
/// exactly.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, CopyGetters)]
#[serde(default)]
#[getset(get_copy = "pub")]
pub struct TimeGrid {
    /// Model time units per observation index (7 days for weekly data).
    period: Real,
    /// Nominal micro-step.
    dt: Real,
    /// Model time at which the initial state is placed. Defaults to one
    /// period before the first reporting time.
    t0: Option<Real>,
}

impl Default for TimeGrid {
    fn default() -> Self {
        TimeGrid {
            period: DAYS_PER_WEEK,
            dt: STEP_SIZE,
            t0: None,
        }
    }
}

impl TimeGrid {
    pub fn new(period: Real, dt: Real) -> Result<Self> {
        let grid = TimeGrid {
            period,
            dt,
            t0: None,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn with_t0(mut self, t0: Real) -> Self {
        self.t0 = Some(t0);
        self
    }

    pub fn with_dt(mut self, dt: Real) -> Self {
        self.dt = dt;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(Error::Config(format!("period must be positive, got {}", self.period)));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(Error::Config(format!("dt must be positive, got {}", self.dt)));
        }
        if self.period / self.dt > MAX_STEPS_PER_PERIOD {
            return Err(Error::Config(format!(
                "dt = {} needs more than {} steps per period",
                self.dt, MAX_STEPS_PER_PERIOD
            )));
        }
        if let Some(t0) = self.t0 {
            if !t0.is_finite() {
                return Err(Error::Config(format!("invalid start time {}", t0)));
            }
        }
        Ok(())
    }

    /// Model time of an observation index.
    pub fn model_time(&self, index: Time) -> Real {
        index as Real * self.period
    }

    /// Model time of the initial state for a run whose first reporting time
    /// is `first`.
    pub fn start(&self, first: Time) -> Result<Real> {
        let start = self.t0.unwrap_or(self.model_time(first) - self.period);
        if start > self.model_time(first) {
            return Err(Error::Config(format!(
                "start time {} is after the first reporting time {}",
                start,
                self.model_time(first)
            )));
        }
        Ok(start)
    }

    /// Number of micro-steps covering [from, to].
    pub fn steps(&self, from: Real, to: Real) -> usize {
        let span = to - from;
        if span <= 0.0 {
            return 0;
        }
        // Guard against round off pushing an exact multiple to the next step.
        let n = span / self.dt;
        let rounded = n.round();
        if (n - rounded).abs() < 1e-9 {
            return rounded.max(1.0) as usize;
        }
        n.ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_weekly_with_daily_steps() {
        let grid = TimeGrid::default();
        assert_eq!(grid.model_time(3), 21.0);
        assert_eq!(grid.start(1).unwrap(), 0.0);
        assert_eq!(grid.steps(0.0, 7.0), 7);
    }

    #[test]
    fn steps_round_up() {
        let grid = TimeGrid::new(7.0, 3.0).unwrap();
        assert_eq!(grid.steps(0.0, 7.0), 3);
        assert_eq!(grid.steps(7.0, 7.0), 0);
        let grid = TimeGrid::new(7.0, 0.1).unwrap();
        assert_eq!(grid.steps(0.0, 7.0), 70);
    }

    #[test]
    fn explicit_start() {
        let grid = TimeGrid::default().with_t0(-14.0);
        assert_eq!(grid.start(1).unwrap(), -14.0);
        assert!(TimeGrid::default().with_t0(10.0).start(1).is_err());
    }

    #[test]
    fn rejects_bad_steps() {
        assert!(TimeGrid::new(7.0, 0.0).is_err());
        assert!(TimeGrid::new(-1.0, 1.0).is_err());
        assert!(TimeGrid::new(7.0, 1e-300).is_err());
        assert!(TimeGrid::new(7.0, 1e-5).is_ok());
    }
}
