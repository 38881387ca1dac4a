//! Measurement models relate the latent accumulated flow of a simulation to
//! reported case counts.
//!
//! The same distributional family is used to generate synthetic reports and
//! to score real reports, so calibration and posterior checks agree.
use crate::{error::Error, prelude::Real, Result};
use rand::Rng;
use rand_distr::{Binomial, Distribution, Gamma, Poisson};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial as BinomialPmf, Discrete, NegativeBinomial};
use std::fmt::Debug;

const NEG_INF: Real = Real::NEG_INFINITY;

pub trait Measurement: Debug + Send + Sync {
    /// Draw a reported count given the latent count.
    fn sample(&self, latent: Real, rng: &mut impl Rng) -> Result<Real>;

    /// Log-probability of an observed count given the latent count.
    ///
    /// Impossible observations (negative, fractional or out of support)
    /// return negative infinity.
    fn log_density(&self, observed: Real, latent: Real) -> Real;

    /// Expected reported count given the latent count.
    fn expected(&self, latent: Real) -> Real;
}

/// Distributional family used for reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingFamily {
    #[default]
    Binomial,
    NegativeBinomial,
}

/// Reporting with probability rho.
///
/// Binomial thins the latent count. NegativeBinomial has mean rho * latent
/// and size k, with variance mean + mean^2 / k.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Reporting {
    Binomial { rho: Real },
    NegativeBinomial { rho: Real, k: Real },
}

impl Reporting {
    pub fn new(family: ReportingFamily, rho: Real, k: Real) -> Self {
        match family {
            ReportingFamily::Binomial => Reporting::Binomial { rho },
            ReportingFamily::NegativeBinomial => Reporting::NegativeBinomial { rho, k },
        }
    }

    pub fn rho(&self) -> Real {
        match *self {
            Reporting::Binomial { rho } | Reporting::NegativeBinomial { rho, .. } => rho,
        }
    }
}

impl Measurement for Reporting {
    fn sample(&self, latent: Real, rng: &mut impl Rng) -> Result<Real> {
        check_latent(latent)?;
        match *self {
            Reporting::Binomial { rho } => {
                check_prob(rho)?;
                let n = latent.round() as u64;
                if n == 0 || rho == 0.0 {
                    return Ok(0.0);
                }
                let distrib = Binomial::new(n, rho)
                    .map_err(|e| Error::Infeasible(format!("reporting binomial: {:?}", e)))?;
                Ok(distrib.sample(rng) as Real)
            }
            Reporting::NegativeBinomial { rho, k } => {
                check_prob(rho)?;
                if !(k.is_finite() && k > 0.0) {
                    return Err(Error::Infeasible(format!("negative binomial size {}", k)));
                }
                let mean = rho * latent;
                if mean <= 0.0 {
                    return Ok(0.0);
                }
                // Gamma-Poisson mixture
                let gamma = Gamma::new(k, mean / k)
                    .map_err(|e| Error::Infeasible(format!("reporting gamma: {:?}", e)))?;
                let lambda: Real = gamma.sample(rng);
                if lambda <= 0.0 {
                    return Ok(0.0);
                }
                let poisson = Poisson::new(lambda)
                    .map_err(|e| Error::Infeasible(format!("reporting poisson: {:?}", e)))?;
                let count: Real = poisson.sample(rng);
                Ok(count)
            }
        }
    }

    fn log_density(&self, observed: Real, latent: Real) -> Real {
        if !is_count(observed) || !(latent.is_finite() && latent >= 0.0) {
            return NEG_INF;
        }
        let y = observed as u64;
        match *self {
            Reporting::Binomial { rho } => {
                let n = latent.round() as u64;
                if n == 0 || rho <= 0.0 {
                    return degenerate(y);
                }
                if y > n || rho > 1.0 {
                    return NEG_INF;
                }
                if rho == 1.0 {
                    return if y == n { 0.0 } else { NEG_INF };
                }
                BinomialPmf::new(rho, n).map_or(NEG_INF, |d| d.ln_pmf(y))
            }
            Reporting::NegativeBinomial { rho, k } => {
                let mean = rho * latent;
                if !(mean > 0.0) {
                    return degenerate(y);
                }
                if !(k.is_finite() && k > 0.0) {
                    return NEG_INF;
                }
                NegativeBinomial::new(k, k / (k + mean)).map_or(NEG_INF, |d| d.ln_pmf(y))
            }
        }
    }

    fn expected(&self, latent: Real) -> Real {
        self.rho() * latent
    }
}

/// Density of a distribution concentrated at zero.
fn degenerate(y: u64) -> Real {
    if y == 0 {
        0.0
    } else {
        NEG_INF
    }
}

fn is_count(x: Real) -> bool {
    x.is_finite() && x >= 0.0 && x.fract() == 0.0
}

fn check_latent(latent: Real) -> Result<()> {
    if latent.is_finite() && latent >= 0.0 {
        return Ok(());
    }
    Err(Error::Infeasible(format!("latent count {}", latent)))
}

fn check_prob(rho: Real) -> Result<()> {
    if (0.0..=1.0).contains(&rho) {
        return Ok(());
    }
    Err(Error::Infeasible(format!("reporting probability {}", rho)))
}
