use std::{env, fs::File, path::Path};

use log::{info, warn};
use rand::{rngs::SmallRng, SeedableRng};
use seir::{
    config::{Config, ModelConfig, SamplerKind},
    prelude::*,
    sim,
    utils::{plot_comparison, plot_vbars, pointwise},
};
use simple_logger::SimpleLogger;

pub fn main() -> Result<()> {
    if let Err(e) = SimpleLogger::new().init() {
        eprintln!("could not start logger: {}", e);
    }

    let path = env::args().nth(1).unwrap_or_else(|| "conf.toml".to_string());
    let cfg = if Path::new(&path).exists() {
        Config::from_path(&path)?
    } else {
        warn!("{} not found, using the default configuration", path);
        Config::default()
    };
    let observed = match &cfg.data {
        Some(data) => Some(data.load()?),
        None => None,
    };
    let times: Vec<Time> = match &observed {
        Some(series) => series.times().clone(),
        None => (1..=cfg.simulation.weeks as Time).collect(),
    };

    match (&cfg.model, cfg.simulation.sampler) {
        (ModelConfig::Seir(m), SamplerKind::EulerBinomial) => {
            run(m.build()?, EulerBinomial, &cfg, &times, observed.as_ref())
        }
        (ModelConfig::Seir(m), SamplerKind::MeanField) => {
            run(m.build()?, MeanField, &cfg, &times, observed.as_ref())
        }
        (ModelConfig::Sir(m), SamplerKind::EulerBinomial) => {
            run(m.build()?, EulerBinomial, &cfg, &times, observed.as_ref())
        }
        (ModelConfig::Sir(m), SamplerKind::MeanField) => {
            run(m.build()?, MeanField, &cfg, &times, observed.as_ref())
        }
    }
}

/// Simulate reports for every replicate and print their pointwise summary.
fn run<M, S>(
    model: M,
    sampler: S,
    cfg: &Config,
    times: &[Time],
    observed: Option<&ObservationSeries>,
) -> Result<()>
where
    M: Model,
    S: TransitionSampler + Clone,
{
    let simulator = Simulator::new(model, cfg.grid).with_sampler(sampler);
    let seed = cfg.simulation.seed;
    let replicates = cfg.simulation.replicates.max(1);
    info!("simulating {} replicates over {} reporting times", replicates, times.len());

    let mut runs = Vec::with_capacity(replicates);
    for r in 0..replicates as u64 {
        let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(r));
        runs.push(simulator.reports(times, &mut rng)?.cases().clone());
    }

    if let Some(path) = &cfg.output.trajectory {
        let snapshots = simulator.simulate(times, seed)?;
        sim::write_csv(&snapshots, File::create(path)?)?;
        info!("trajectory written to {}", path.display());
    }

    let summary = pointwise(&runs);
    println!("time,mean,std,min,max");
    for (t, st) in times.iter().zip(&summary) {
        println!("{},{},{},{},{}", t, st.mean(), st.std(), st.min(), st.max());
    }

    if cfg.output.plot {
        let means: Vec<Real> = summary.iter().map(|st| st.mean()).collect();
        match observed {
            Some(series) => print!("{}", plot_comparison(times, series.cases(), &means, 60)),
            None => print!("{}", plot_vbars(&means, 15)),
        }
    }
    Ok(())
}
