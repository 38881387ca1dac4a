//! TOML run configuration shared by the binaries.
//!
//! ```toml
//! [data]
//! kind = "daily_cumulative"
//! path = "cases.csv"
//! column = "confirmed"
//! negatives = "floor"
//!
//! [model]
//! kind = "seir"
//! flow = "onset"
//! reporting = "binomial"
//!
//! [model.params]
//! beta = 0.35
//! N = 5000000.0
//!
//! [[calibration.free]]
//! name = "beta"
//! lower = 0.05
//! upper = 2.0
//!
//! [calibration.strategy]
//! method = "annealing"
//! max_evaluations = 500
//! ```
use crate::{
    calibration::{EvalSettings, Strategy},
    data::{load_weekly, NegativePolicy, ObservationSeries},
    error::Error,
    measurement::ReportingFamily,
    models::{Flow, SeirModel, SirModel},
    params::{FreeParam, SeirParams, SirParams},
    sim::TimeGrid,
    Result,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Observed series. Required by the calibration.
    pub data: Option<DataConfig>,
    pub model: ModelConfig,
    pub grid: TimeGrid,
    pub simulation: SimulationConfig,
    pub calibration: CalibrationConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(data)?;
        cfg.grid.validate()?;
        Ok(cfg)
    }

    /// Load the observed series described by the data section.
    pub fn observations(&self) -> Result<ObservationSeries> {
        match &self.data {
            Some(data) => data.load(),
            None => Err(Error::Config("missing [data] section".into())),
        }
    }
}

/// Source of the observed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataConfig {
    /// A `time,cases` CSV, already aggregated.
    Series { path: PathBuf },
    /// One column of daily cumulative counts, aggregated into weekly new
    /// cases. The negative difference policy must be given.
    DailyCumulative {
        path: PathBuf,
        column: String,
        negatives: NegativePolicy,
    },
}

impl DataConfig {
    pub fn load(&self) -> Result<ObservationSeries> {
        match self {
            DataConfig::Series { path } => ObservationSeries::from_csv(path),
            DataConfig::DailyCumulative {
                path,
                column,
                negatives,
            } => load_weekly(path, column, *negatives),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    Seir(SeirConfig),
    Sir(SirConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Seir(SeirConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeirConfig {
    pub params: SeirParams,
    pub flow: Option<Flow>,
    pub reporting: Option<ReportingFamily>,
}

impl SeirConfig {
    pub fn build(&self) -> Result<SeirModel> {
        let mut model = SeirModel::new(self.params)?;
        if let Some(flow) = self.flow {
            model = model.with_flow(flow);
        }
        if let Some(reporting) = self.reporting {
            model = model.with_reporting(reporting);
        }
        Ok(model)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SirConfig {
    pub params: SirParams,
    pub flow: Option<Flow>,
    pub reporting: Option<ReportingFamily>,
}

impl SirConfig {
    pub fn build(&self) -> Result<SirModel> {
        let mut model = SirModel::new(self.params)?;
        if let Some(flow) = self.flow {
            model = model.with_flow(flow);
        }
        if let Some(reporting) = self.reporting {
            model = model.with_reporting(reporting);
        }
        Ok(model)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    #[default]
    EulerBinomial,
    MeanField,
}

/// Forward simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Reporting times 1..=weeks, used when no data is given.
    pub weeks: usize,
    pub seed: u64,
    pub replicates: usize,
    pub sampler: SamplerKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            weeks: 4,
            seed: 42,
            replicates: 1,
            sampler: SamplerKind::EulerBinomial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub free: Vec<FreeParam>,
    pub strategy: Strategy,
    pub settings: EvalSettings,
}

/// Files written by the binaries. Missing entries are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub trajectory: Option<PathBuf>,
    pub fit: Option<PathBuf>,
    pub trace: Option<PathBuf>,
    pub params: Option<PathBuf>,
    pub plot: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            trajectory: None,
            fit: None,
            trace: None,
            params: None,
            plot: true,
        }
    }
}
