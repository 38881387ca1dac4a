use std::{env, fs, fs::File};

use log::info;
use seir::{
    config::{Config, ModelConfig, SamplerKind},
    data::write_comparison,
    prelude::*,
    trackers::{Every, FnTracker},
    utils::plot_comparison,
};
use serde::Serialize;
use simple_logger::SimpleLogger;

pub fn main() -> Result<()> {
    if let Err(e) = SimpleLogger::new().init() {
        eprintln!("could not start logger: {}", e);
    }

    let path = env::args().nth(1).unwrap_or_else(|| "conf.toml".to_string());
    let cfg = Config::from_path(&path)?;
    let observed = cfg.observations()?;
    info!("loaded {} observations from {}", observed.len(), path);

    let sampler = cfg.simulation.sampler;
    match &cfg.model {
        ModelConfig::Seir(m) => match sampler {
            SamplerKind::EulerBinomial => fit(m.build()?, EulerBinomial, &cfg, observed),
            SamplerKind::MeanField => fit(m.build()?, MeanField, &cfg, observed),
        },
        ModelConfig::Sir(m) => match sampler {
            SamplerKind::EulerBinomial => fit(m.build()?, EulerBinomial, &cfg, observed),
            SamplerKind::MeanField => fit(m.build()?, MeanField, &cfg, observed),
        },
    }
}

fn fit<M, S>(model: M, sampler: S, cfg: &Config, observed: ObservationSeries) -> Result<()>
where
    M: Model,
    M::Params: Serialize,
    S: TransitionSampler + Clone,
{
    let section = &cfg.calibration;
    let simulator = Simulator::new(model, cfg.grid).with_sampler(sampler);
    let evaluator = CostEvaluator::new(
        simulator,
        observed,
        section.free.clone(),
        section.settings.clone(),
    )?;

    let mut trace = Trace::new(evaluator.names());
    let mut progress = Every::new(
        50,
        FnTracker(|rec: &TraceRecord| info!("eval {}: cost = {}", rec.iteration, rec.cost)),
    );
    let result = calibrate(&evaluator, &section.strategy, &mut (&mut trace, &mut progress))?;

    println!("{}", result.termination());
    println!(
        "cost = {}, evaluations = {}, converged = {}",
        result.cost(),
        result.evaluations(),
        result.converged()
    );
    for (name, value) in evaluator.names().iter().zip(result.candidate()) {
        println!("{} = {}", name, value);
    }

    let fitted = evaluator.simulate_fit(result.candidate())?;
    let observed = evaluator.observed();
    let output = &cfg.output;
    if let Some(path) = &output.fit {
        write_comparison(observed, &fitted, File::create(path)?)?;
        info!("fit written to {}", path.display());
    }
    if let Some(path) = &output.trace {
        trace.to_csv(path)?;
        info!("trace with {} records written to {}", trace.len(), path.display());
    }
    if let Some(path) = &output.params {
        let data = toml::to_string(result.params()).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, data)?;
    }
    if output.plot {
        print!(
            "{}",
            plot_comparison(observed.times(), observed.cases(), fitted.cases(), 60)
        );
    }
    Ok(())
}
