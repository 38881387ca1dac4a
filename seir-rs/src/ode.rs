//! Deterministic reference solution of the SEIR equations.
//!
//! The stochastic simulator converges to these equations as dt goes to zero
//! and the population grows, so the solver is used to check the simulator
//! and to draw smooth curves next to noisy runs.
use crate::{
    error::Error,
    models::{Flow, Model, SeirModel, SeirState},
    prelude::{Real, Time},
    sim::{Snapshot, TimeGrid},
    Result,
};

/// Fixed-step RK4 step for a system of ODEs y' = f(t, y).
pub fn rk4_step<F>(y: &mut [Real], t: Real, dt: Real, mut f: F)
where
    F: FnMut(Real, &[Real], &mut [Real]),
{
    let n = y.len();
    let mut k1 = vec![0.0; n];
    let mut k2 = vec![0.0; n];
    let mut k3 = vec![0.0; n];
    let mut k4 = vec![0.0; n];
    let mut ytmp = vec![0.0; n];

    f(t, y, &mut k1);

    for i in 0..n {
        ytmp[i] = y[i] + 0.5 * dt * k1[i];
    }
    f(t + 0.5 * dt, &ytmp, &mut k2);

    for i in 0..n {
        ytmp[i] = y[i] + 0.5 * dt * k2[i];
    }
    f(t + 0.5 * dt, &ytmp, &mut k3);

    for i in 0..n {
        ytmp[i] = y[i] + dt * k3[i];
    }
    f(t + dt, &ytmp, &mut k4);

    for i in 0..n {
        y[i] += (dt / 6.0) * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
}

/// Solve the SEIR equations of a model on the reporting times of a grid.
///
/// The state vector carries S, E, I, R and the cumulative count of the
/// model's accumulated flow, so snapshots are directly comparable with the
/// stochastic ones. `h` is the nominal integration step.
pub fn solve_seir(
    model: &SeirModel,
    grid: &TimeGrid,
    times: &[Time],
    h: Real,
) -> Result<Vec<Snapshot<SeirState>>> {
    if !(h.is_finite() && h > 0.0) {
        return Err(Error::Config(format!("integration step must be positive, got {}", h)));
    }
    let p = model.params();
    let (beta, sigma, gamma, pop) = (p.beta(), p.sigma(), p.gamma(), p.pop());
    let flow = model.flow();
    let rhs = |_t: Real, y: &[Real], dy: &mut [Real]| {
        let infection = beta * y[0] * y[2] / pop;
        let onset = sigma * y[1];
        let removal = gamma * y[2];
        dy[0] = -infection;
        dy[1] = infection - onset;
        dy[2] = onset - removal;
        dy[3] = removal;
        dy[4] = match flow {
            Flow::Exposure => infection,
            Flow::Onset => onset,
            Flow::Removal => removal,
        };
    };

    let init = model.initial_state();
    let mut y = [init.s, init.e, init.i, init.r, 0.0];
    let mut out = Vec::with_capacity(times.len());
    let mut clock = match times.first() {
        Some(&first) => grid.start(first)?,
        None => return Ok(out),
    };
    let stepper = grid.with_dt(h);
    for &time in times {
        let target = grid.model_time(time);
        let n = stepper.steps(clock, target);
        let before = y[4];
        if n > 0 {
            let dt = (target - clock) / n as Real;
            for k in 0..n {
                rk4_step(&mut y, clock + k as Real * dt, dt, rhs);
            }
        }
        clock = target;
        out.push(Snapshot {
            time,
            state: SeirState::new(y[0], y[1], y[2], y[3]),
            accumulated: y[4] - before,
        });
    }
    return Ok(out);
}
