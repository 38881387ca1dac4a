use crate::prelude::*;
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

pub trait Stats {
    fn add(&mut self, x: Real);
    fn add_many<I>(&mut self, xs: I)
    where
        I: IntoIterator<Item = Real>,
    {
        for x in xs {
            self.add(x);
        }
    }
    fn size(&self) -> usize;
    fn mean(&self) -> Real;
    fn var(&self) -> Real;
    fn min(&self) -> Real;
    fn max(&self) -> Real;
    fn std(&self) -> Real {
        self.var().sqrt()
    }
    fn stats(&self) -> PointStats {
        PointStats {
            mean: self.mean(),
            std: self.std(),
            min: self.min(),
            max: self.max(),
            size: self.size(),
        }
    }
}

/// Streaming mean and variance (Welford's update).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RunningStats {
    n: usize,
    mean: Real,
    m2: Real,
    min: Real,
    max: Real,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        RunningStats {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            min: INF,
            max: -INF,
        }
    }
}

impl Stats for RunningStats {
    fn add(&mut self, x: Real) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as Real;
        self.m2 += delta * (x - self.mean);
        self.min = Real::min(x, self.min);
        self.max = Real::max(x, self.max);
    }

    fn size(&self) -> usize {
        self.n
    }

    fn mean(&self) -> Real {
        if self.n == 0 {
            return NAN;
        }
        self.mean
    }

    /// Population variance.
    fn var(&self) -> Real {
        if self.n == 0 {
            return NAN;
        }
        self.m2 / self.n as Real
    }

    fn min(&self) -> Real {
        self.min
    }

    fn max(&self) -> Real {
        self.max
    }
}

impl Tracker<Real> for RunningStats {
    fn track(&mut self, value: &Real) {
        self.add(*value);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct PointStats {
    mean: Real,
    std: Real,
    min: Real,
    max: Real,
    size: usize,
}

/// Statistics of each position across a set of equally long runs.
pub fn pointwise(runs: &[Vec<Real>]) -> Vec<PointStats> {
    let len = runs.iter().map(|r| r.len()).min().unwrap_or(0);
    (0..len)
        .map(|i| {
            let mut acc = RunningStats::new();
            acc.add_many(runs.iter().map(|r| r[i]));
            acc.stats()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn simple_stats() {
        let mut acc = RunningStats::new();
        acc.add(0.);
        acc.add_many(vec![1., 2., 3., 4.]);
        let st = acc.stats();
        assert_eq!(st.size(), 5);
        assert_approx_eq!(st.mean(), 2.0, 0.001);
        assert_approx_eq!(st.std(), 1.4142, 0.001);
        assert_eq!(st.min(), 0.0);
        assert_eq!(st.max(), 4.0);
    }

    #[test]
    fn empty_stats_are_nan() {
        let acc = RunningStats::new();
        assert!(acc.mean().is_nan());
        assert!(acc.var().is_nan());
    }

    #[test]
    fn pointwise_over_runs() {
        let runs = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0, 7.0]];
        let st = pointwise(&runs);
        assert_eq!(st.len(), 2);
        assert_approx_eq!(st[0].mean(), 3.0, 1e-12);
        assert_approx_eq!(st[1].std(), 0.0, 1e-12);
    }
}
