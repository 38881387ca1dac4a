use super::{check_positive, check_rate, check_unit, constants as cte};
use crate::{error::Error, param_set, prelude::Real, Result};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Parameters of the four compartment SEIR model.
///
/// Rates are expressed per unit of model time (days, by default).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, CopyGetters)]
#[serde(default)]
#[getset(get_copy = "pub")]
pub struct SeirParams {
    /// Contact rate. Force of infection is beta * I / N.
    pub(crate) beta: Real,
    /// Rate of leaving the exposed compartment (1 / incubation period).
    pub(crate) sigma: Real,
    /// Recovery rate (1 / infectious period).
    pub(crate) gamma: Real,
    /// Total population.
    #[serde(rename = "N")]
    pub(crate) pop: Real,
    /// Reporting probability.
    pub(crate) rho: Real,
    /// Negative binomial size, used only by the negative binomial reporting.
    pub(crate) k: Real,
    #[serde(rename = "E0")]
    pub(crate) e0: Real,
    #[serde(rename = "I0")]
    pub(crate) i0: Real,
}

impl Default for SeirParams {
    fn default() -> Self {
        SeirParams {
            beta: cte::CONTACT_RATE,
            sigma: 1.0 / cte::INCUBATION_PERIOD,
            gamma: 1.0 / cte::INFECTIOUS_PERIOD,
            pop: cte::POPULATION,
            rho: cte::PROB_REPORTING,
            k: cte::OVERDISPERSION,
            e0: 0.0,
            i0: 1.0,
        }
    }
}

impl SeirParams {
    pub fn new(beta: Real, sigma: Real, gamma: Real, pop: Real, rho: Real) -> Self {
        SeirParams {
            beta,
            sigma,
            gamma,
            pop,
            rho,
            ..Self::default()
        }
    }

    /// Basic reproduction number of the deterministic model.
    pub fn r0(&self) -> Real {
        self.beta / self.gamma
    }
}

fn validate(p: &SeirParams) -> Result<()> {
    check_positive("N", p.pop)?;
    check_rate("beta", p.beta)?;
    check_rate("sigma", p.sigma)?;
    check_rate("gamma", p.gamma)?;
    check_unit("rho", p.rho)?;
    check_positive("k", p.k)?;
    check_rate("E0", p.e0)?;
    check_rate("I0", p.i0)?;
    if p.e0 + p.i0 > p.pop {
        return Err(Error::invalid("E0 + I0", p.e0 + p.i0, "exceeds the population"));
    }
    return Ok(());
}

param_set!(SeirParams {
    beta => "beta",
    sigma => "sigma",
    gamma => "gamma",
    pop => "N",
    rho => "rho",
    k => "k",
    e0 => "E0",
    i0 => "I0",
}, validate = validate);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamSet;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn defaults_are_valid() {
        let params = SeirParams::default();
        assert!(params.validate().is_ok());
        assert_approx_eq!(params.r0(), 0.35 * 14.0, 1e-12);
    }

    #[test]
    fn rejects_non_positive_population() {
        let err = SeirParams::default().with_pop(0.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "N"));
        assert!(SeirParams::default().with_pop(-5.0).validate().is_err());
    }

    #[test]
    fn rejects_out_of_domain_values() {
        assert!(SeirParams::default().with_beta(-1.0).validate().is_err());
        assert!(SeirParams::default().with_rho(0.0).validate().is_err());
        assert!(SeirParams::default().with_rho(1.2).validate().is_err());
        assert!(SeirParams::default().with_gamma(Real::NAN).validate().is_err());
        assert!(SeirParams::default()
            .with_pop(10.0)
            .with_i0(11.0)
            .validate()
            .is_err());
    }

    #[test]
    fn named_access() {
        let mut params = SeirParams::default();
        params.set("N", 1000.0).unwrap();
        assert_eq!(params.pop(), 1000.0);
        assert_eq!(params.get("E0"), Some(0.0));
        assert!(params.set("delta", 1.0).is_err());
        assert_eq!(SeirParams::NAMES.len(), params.values().len());
    }

    #[test]
    fn toml_roundtrip() {
        let params = SeirParams::default().with_beta(0.5);
        let data = toml::to_string(&params).unwrap();
        assert!(data.contains("N = "));
        let back: SeirParams = toml::from_str(&data).unwrap();
        assert_eq!(params, back);
    }
}
