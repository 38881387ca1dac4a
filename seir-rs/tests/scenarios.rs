use rand::{rngs::SmallRng, SeedableRng};
use seir::{
    data::{aggregate_weekly, load_weekly},
    ode::solve_seir,
    params::PENALTY,
    prelude::*,
    utils::{RunningStats, Stats},
};
use std::fs;

fn scenario_params() -> SeirParams {
    SeirParams::new(0.35, 0.3, 1.0 / 14.0, 5e6, 0.5)
}

fn growing_model() -> SeirModel {
    let params = SeirParams::new(0.5, 0.3, 0.2, 1e5, 0.5).with_i0(100.0);
    SeirModel::new(params).unwrap()
}

#[test]
fn four_week_run_is_reproducible() {
    let model = SeirModel::new(scenario_params()).unwrap();
    let sim = Simulator::new(model, TimeGrid::default());
    let times = [0, 1, 2, 3];

    let mut rng = SmallRng::seed_from_u64(42);
    let first = sim.reports(&times, &mut rng).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);
    let second = sim.reports(&times, &mut rng).unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    for &y in first.cases() {
        assert!(y >= 0.0);
        assert_eq!(y.fract(), 0.0);
    }
}

#[test]
fn zero_population_is_rejected_before_running() {
    let err = SeirModel::new(scenario_params().with_pop(0.0)).unwrap_err();
    match err {
        Error::InvalidParameter { name, .. } => assert_eq!(name, "N"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn local_search_without_budget_returns_initial_guess() {
    let model = SeirModel::new(scenario_params()).unwrap();
    let sim = Simulator::new(model, TimeGrid::default());
    let observed = ObservationSeries::from_counts(vec![0.0, 1.0, 1.0, 2.0]).unwrap();
    let free = vec![FreeParam::new("beta"), FreeParam::new("gamma").with_initial(0.1)];
    let evaluator = CostEvaluator::new(sim, observed, free, EvalSettings::default()).unwrap();

    let strategy = Strategy::NelderMead(LocalSearch {
        max_iterations: 0,
        sd_tolerance: 1e-6,
    });
    let mut trace = Trace::new(evaluator.names());
    let result = calibrate(&evaluator, &strategy, &mut trace).unwrap();

    assert_eq!(result.candidate(), &vec![0.35, 0.1]);
    assert_eq!(result.params().gamma(), 0.1);
    assert!(!result.converged());
    assert!(trace.is_empty());
}

#[test]
fn population_is_conserved_for_any_step() {
    let model = growing_model();
    let times: Vec<Time> = (1..=8).collect();
    for &dt in &[0.05, 0.3, 1.0, 2.5, 7.0, 10.0] {
        let grid = TimeGrid::default().with_dt(dt);
        let sim = Simulator::new(model.clone(), grid);
        for seed in 0..5 {
            for snapshot in sim.trajectory(&times, SmallRng::seed_from_u64(seed)).unwrap() {
                let snapshot = snapshot.unwrap();
                assert_eq!(snapshot.state.total(), 1e5, "dt = {}", dt);
                assert!(snapshot.state.check().is_ok());
            }
        }
    }
}

#[test]
fn mean_field_approaches_ode_as_dt_shrinks() {
    let model = growing_model();
    let times: Vec<Time> = (1..=4).collect();
    let exact = solve_seir(&model, &TimeGrid::default(), &times, 0.01).unwrap();

    let max_error = |dt: Real| -> Real {
        let sim = Simulator::new(model.clone(), TimeGrid::default().with_dt(dt)).with_sampler(MeanField);
        sim.simulate(&times, 0)
            .unwrap()
            .iter()
            .zip(&exact)
            .map(|(a, b)| ((a.accumulated - b.accumulated) / b.accumulated).abs())
            .fold(0.0, Real::max)
    };
    let coarse = max_error(0.5);
    let fine = max_error(0.01);
    assert!(fine < coarse, "{} >= {}", fine, coarse);
    assert!(fine < 0.03, "relative error {}", fine);
}

#[test]
fn stochastic_mean_follows_mean_field() {
    let model = growing_model();
    let grid = TimeGrid::default().with_dt(0.25);
    let times: Vec<Time> = (1..=4).collect();
    let reference = Simulator::new(model.clone(), grid)
        .with_sampler(MeanField)
        .simulate(&times, 0)
        .unwrap();

    let sim = Simulator::new(model, grid);
    let mut acc = vec![RunningStats::new(); times.len()];
    for seed in 0..200 {
        let run = sim.simulate(&times, seed).unwrap();
        for (stats, snapshot) in acc.iter_mut().zip(&run) {
            stats.add(snapshot.accumulated);
        }
    }
    for (stats, expected) in acc.iter().zip(&reference) {
        let rel = (stats.mean() - expected.accumulated).abs() / expected.accumulated;
        assert!(rel < 0.05, "week {}: {} vs {}", expected.time, stats.mean(), expected.accumulated);
    }
}

#[test]
fn stochastic_mean_approaches_ode_as_dt_shrinks() {
    let model = growing_model();
    let times: Vec<Time> = (1..=4).collect();
    let exact = solve_seir(&model, &TimeGrid::default(), &times, 0.01).unwrap();

    let mut errors = vec![];
    for &dt in &[1.0, 0.25, 0.1] {
        let sim = Simulator::new(model.clone(), TimeGrid::default().with_dt(dt));
        let mut acc = vec![RunningStats::new(); times.len()];
        for seed in 0..400 {
            for (stats, snapshot) in acc.iter_mut().zip(sim.simulate(&times, seed).unwrap()) {
                stats.add(snapshot.accumulated);
            }
        }
        let error = acc
            .iter()
            .zip(&exact)
            .map(|(stats, b)| ((stats.mean() - b.accumulated) / b.accumulated).abs())
            .fold(0.0, Real::max);
        // first order scheme plus Monte Carlo noise
        assert!(error < 0.35 * dt + 0.05, "dt = {}: relative error {}", dt, error);
        errors.push(error);
    }
    assert!(errors[2] < errors[0], "{:?}", errors);
}

#[test]
fn likelihood_rejects_negative_weeks() {
    let mut daily = vec![];
    for total in &[0.0, 30.0, 25.0, 60.0] {
        daily.extend(std::iter::repeat(*total).take(7));
    }
    let observed = aggregate_weekly(&daily, NegativePolicy::Keep).unwrap();
    assert_eq!(observed.cases(), &vec![30.0, -5.0, 35.0]);

    let sim = Simulator::new(growing_model(), TimeGrid::default());
    let settings = EvalSettings {
        objective: Objective::NegLogLik,
        ..EvalSettings::default()
    };
    let result = CostEvaluator::new(sim, observed, vec![FreeParam::new("beta")], settings);
    assert!(matches!(result, Err(Error::InvalidCount { index: 1, .. })));
}

#[test]
fn evaluator_is_deterministic_for_pinned_seed() {
    let sim = Simulator::new(growing_model(), TimeGrid::default());
    let observed = ObservationSeries::from_counts(vec![40.0, 90.0, 200.0]).unwrap();
    let settings = EvalSettings {
        objective: Objective::NegLogLik,
        replicates: 5,
        seed: 11,
        ..EvalSettings::default()
    };
    let free = vec![FreeParam::new("beta"), FreeParam::new("rho")];
    let a = CostEvaluator::new(sim.clone(), observed.clone(), free.clone(), settings.clone()).unwrap();
    let b = CostEvaluator::new(sim, observed, free, settings).unwrap();
    for candidate in &[[0.5, 0.5], [0.7, 0.3], [-1.0, 0.5]] {
        assert_eq!(a.evaluate(candidate).unwrap(), b.evaluate(candidate).unwrap());
    }
    assert_eq!(a.evaluate(&[-1.0, 0.5]).unwrap(), PENALTY);
}

#[test]
fn annealing_candidates_stay_in_the_box() {
    let sim = Simulator::new(growing_model(), TimeGrid::default());
    let observed = ObservationSeries::from_counts(vec![40.0, 90.0, 200.0, 420.0]).unwrap();
    let free = vec![
        FreeParam::bounded("beta", 0.2, 0.9),
        FreeParam::bounded("rho", 0.1, 1.0).with_initial(5.0),
    ];
    let evaluator = CostEvaluator::new(sim, observed, free, EvalSettings::default()).unwrap();
    let strategy = Strategy::Annealing(GlobalSearch {
        max_evaluations: 120,
        step_scale: 0.5,
        seed: 17,
        ..GlobalSearch::default()
    });
    let mut trace = Trace::new(evaluator.names());
    let result = calibrate(&evaluator, &strategy, &mut trace).unwrap();

    assert_eq!(trace.len(), 120);
    // the initial guess is clamped into the box
    assert_eq!(trace.records()[0].params[1], 1.0);
    for rec in trace.records() {
        assert!((0.2..=0.9).contains(&rec.params[0]));
        assert!((0.1..=1.0).contains(&rec.params[1]));
    }
    assert_eq!(result.cost(), trace.best().unwrap().cost);
}

#[test]
fn daily_cumulative_file_to_fit() {
    // 5 weeks of cumulative counts with a correction in week 3
    let weekly_totals = [0.0, 30.0, 80.0, 75.0, 160.0];
    let mut data = String::from("day,confirmed\n");
    for (w, total) in weekly_totals.iter().enumerate() {
        for d in 0..7 {
            data.push_str(&format!("{},{}\n", 7 * w + d, total));
        }
    }
    let path = std::env::temp_dir().join(format!("seir-daily-{}.csv", std::process::id()));
    fs::write(&path, data).unwrap();
    let observed = load_weekly(&path, "confirmed", NegativePolicy::Floor).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(observed.times(), &vec![1, 2, 3, 4]);
    assert_eq!(observed.cases(), &vec![30.0, 50.0, 0.0, 85.0]);

    let sim = Simulator::new(growing_model(), TimeGrid::default()).with_sampler(MeanField);
    let evaluator =
        CostEvaluator::new(sim, observed.clone(), vec![FreeParam::new("beta")], EvalSettings::default())
            .unwrap();
    let strategy = Strategy::NelderMead(LocalSearch {
        max_iterations: 20,
        sd_tolerance: 1e-8,
    });
    let result = calibrate(&evaluator, &strategy, &mut ()).unwrap();
    let fitted = evaluator.simulate_fit(result.candidate()).unwrap();
    assert!(observed.check_aligned(&fitted).is_ok());
    assert!(result.evaluations() > 0);
}

#[test]
fn dropping_negative_weeks_skips_indices() {
    let mut daily = vec![];
    for total in &[10.0, 20.0, 15.0, 30.0] {
        daily.extend(std::iter::repeat(*total).take(7));
    }
    let series = aggregate_weekly(&daily, NegativePolicy::Drop).unwrap();
    assert_eq!(series.times(), &vec![1, 3]);
}
