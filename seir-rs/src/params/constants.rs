use crate::prelude::Real;

///////////////////////////////////////////////////////////////////////////////
// Default param for COVID-19
///////////////////////////////////////////////////////////////////////////////

/// Rates are given per day.
pub const CONTACT_RATE: Real = 0.35;
pub const INCUBATION_PERIOD: Real = 3.69;
pub const INFECTIOUS_PERIOD: Real = 14.0;
pub const POPULATION: Real = 5_000_000.0;
pub const PROB_REPORTING: Real = 0.5;

/// Size of the negative binomial reporting distribution. Larger values are
/// closer to Poisson.
pub const OVERDISPERSION: Real = 10.0;

/// Initial susceptible fraction of the two-compartment model.
pub const SUSCEPTIBLE_FRACTION: Real = 0.05;

// Time grid
pub const DAYS_PER_WEEK: Real = 7.0;
pub const STEP_SIZE: Real = 1.0;

/// Cost assigned to infeasible candidates.
pub const PENALTY: Real = 1e20;
