use super::{check_positive, check_rate, check_unit, constants as cte};
use crate::{error::Error, param_set, prelude::Real, Result};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Parameters of the two-compartment (SIR) variant used during exploratory
/// fits. Only a fraction eta of the population starts susceptible.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, CopyGetters)]
#[serde(default)]
#[getset(get_copy = "pub")]
pub struct SirParams {
    pub(crate) beta: Real,
    /// Removal rate from the infectious compartment.
    #[serde(rename = "mu_IR")]
    pub(crate) mu_ir: Real,
    /// Initial susceptible fraction.
    pub(crate) eta: Real,
    #[serde(rename = "N")]
    pub(crate) pop: Real,
    pub(crate) rho: Real,
    pub(crate) k: Real,
}

impl Default for SirParams {
    fn default() -> Self {
        SirParams {
            beta: cte::CONTACT_RATE,
            mu_ir: 1.0 / cte::INFECTIOUS_PERIOD,
            eta: cte::SUSCEPTIBLE_FRACTION,
            pop: cte::POPULATION,
            rho: cte::PROB_REPORTING,
            k: cte::OVERDISPERSION,
        }
    }
}

impl SirParams {
    /// Initial number of susceptible individuals, excluding the index case.
    pub fn initial_susceptible(&self) -> Real {
        (self.eta * self.pop).round() - 1.0
    }
}

fn validate(p: &SirParams) -> Result<()> {
    check_positive("N", p.pop)?;
    check_rate("beta", p.beta)?;
    check_rate("mu_IR", p.mu_ir)?;
    check_unit("eta", p.eta)?;
    check_unit("rho", p.rho)?;
    check_positive("k", p.k)?;
    if p.initial_susceptible() < 0.0 {
        return Err(Error::invalid("eta", p.eta, "leaves no room for the index case"));
    }
    return Ok(());
}

param_set!(SirParams {
    beta => "beta",
    mu_ir => "mu_IR",
    eta => "eta",
    pop => "N",
    rho => "rho",
    k => "k",
}, validate = validate);
