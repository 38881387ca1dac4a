use crate::{error::Error, prelude::Real, Result};
use rand::Rng;
use rand_distr::{Binomial, Distribution};

/// The sampler trait defines how many individuals leave a compartment during
/// a single step of the simulation.
///
/// Models call it once per outgoing flow and per micro-step, so it only sees
/// the current count of the source compartment, the per-capita exit rate and
/// the step size.
pub trait TransitionSampler: Send + Sync {
    /// Number of individuals, out of n, that leave a compartment with the
    /// given exit rate during dt. The result never exceeds n.
    fn transitions(&self, n: Real, rate: Real, dt: Real, rng: &mut impl Rng) -> Result<Real>;
}

////////////////////////////////////////////////////////////////////////////////
// CONCRETE IMPLEMENTATIONS
////////////////////////////////////////////////////////////////////////////////

/// Draws transitions from Binomial(n, 1 - exp(-rate * dt)).
///
/// This is the Euler-multinomial approximation of the continuous time Markov
/// chain: it converges to the jump process as dt goes to zero and never
/// moves more individuals than available.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct EulerBinomial;

impl TransitionSampler for EulerBinomial {
    fn transitions(&self, n: Real, rate: Real, dt: Real, rng: &mut impl Rng) -> Result<Real> {
        euler_binomial(n, rate, dt, rng)
    }
}

/// Replaces each draw by its expectation n * p.
///
/// The simulator then reduces to the explicit Euler scheme of the exponential
/// transition ODE. Consumes no randomness.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct MeanField;

impl TransitionSampler for MeanField {
    fn transitions(&self, n: Real, rate: Real, dt: Real, _rng: &mut impl Rng) -> Result<Real> {
        check_inputs(n, rate, dt)?;
        Ok(n * transition_prob(rate, dt))
    }
}

/// Probability of leaving a compartment with exit rate `rate` during `dt`.
#[inline(always)]
pub fn transition_prob(rate: Real, dt: Real) -> Real {
    -(-rate * dt).exp_m1()
}

/// Binomial draw of the number of transitions out of a compartment of size n.
///
/// Counts are floored to integers before drawing and an empty compartment
/// always returns zero without touching the random stream.
pub fn euler_binomial(n: Real, rate: Real, dt: Real, rng: &mut impl Rng) -> Result<Real> {
    check_inputs(n, rate, dt)?;
    let count = n.floor() as u64;
    let prob = transition_prob(rate, dt).min(1.0);
    if count == 0 || prob <= 0.0 {
        return Ok(0.0);
    }
    let distrib = Binomial::new(count, prob)
        .map_err(|e| Error::Infeasible(format!("binomial({}, {}): {:?}", count, prob, e)))?;
    return Ok(distrib.sample(rng) as Real);
}

fn check_inputs(n: Real, rate: Real, dt: Real) -> Result<()> {
    if !(n.is_finite() && n >= 0.0) {
        return Err(Error::Infeasible(format!("compartment size {}", n)));
    }
    if !(rate.is_finite() && rate >= 0.0) {
        return Err(Error::Infeasible(format!("transition rate {}", rate)));
    }
    if !(dt.is_finite() && dt >= 0.0) {
        return Err(Error::Infeasible(format!("step size {}", dt)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn empty_compartment_draws_nothing() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(euler_binomial(0.0, 5.0, 1.0, &mut rng).unwrap(), 0.0);
        }
    }

    #[test]
    fn draws_never_exceed_source() {
        let mut rng = SmallRng::seed_from_u64(7);
        for &n in &[1.0, 3.0, 17.0, 1_000.0, 5_000_000.0] {
            for &rate in &[0.01, 0.5, 3.0, 50.0] {
                for &dt in &[0.1, 1.0, 7.0] {
                    let x = euler_binomial(n, rate, dt, &mut rng).unwrap();
                    assert!(x >= 0.0 && x <= n, "{} transitions out of {}", x, n);
                    assert_eq!(x, x.floor());
                }
            }
        }
    }

    #[test]
    fn huge_hazard_moves_everyone() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(euler_binomial(250.0, 1e6, 1.0, &mut rng).unwrap(), 250.0);
    }

    #[test]
    fn mean_matches_probability() {
        let mut rng = SmallRng::seed_from_u64(11);
        let (n, rate, dt) = (200.0, 0.3, 0.5);
        let reps = 20_000;
        let total: Real = (0..reps)
            .map(|_| euler_binomial(n, rate, dt, &mut rng).unwrap())
            .sum();
        let expected = n * transition_prob(rate, dt);
        assert_approx_eq!(total / reps as Real, expected, 0.2);
    }

    #[test]
    fn invalid_inputs_are_infeasible() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(euler_binomial(10.0, -0.1, 1.0, &mut rng).unwrap_err().is_infeasible());
        assert!(euler_binomial(-1.0, 0.1, 1.0, &mut rng).unwrap_err().is_infeasible());
        assert!(euler_binomial(10.0, Real::NAN, 1.0, &mut rng).is_err());
    }

    #[test]
    fn mean_field_is_deterministic() {
        let mut rng = SmallRng::seed_from_u64(1);
        let x = MeanField.transitions(100.0, 0.2, 1.0, &mut rng).unwrap();
        assert_approx_eq!(x, 100.0 * (1.0 - (-0.2 as Real).exp()), 1e-12);
        assert_approx_eq!(transition_prob(0.0, 3.0), 0.0, 1e-15);
    }
}
