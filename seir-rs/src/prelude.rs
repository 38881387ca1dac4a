pub use crate::calibration::{
    calibrate, Calibration, CostEvaluator, EvalSettings, GlobalSearch, LocalSearch, Objective,
    Seeding, Strategy, Trace, TraceRecord,
};
pub use crate::data::{NegativePolicy, ObservationSeries};
pub use crate::error::{Error, Result};
pub use crate::measurement::{Measurement, Reporting, ReportingFamily};
pub use crate::models::{CompartmentState, Flow, Model, SeirModel, SeirState, SirModel, SirState};
pub use crate::params::{FreeParam, ParamSet, SeirParams, SirParams};
pub use crate::sampler::{EulerBinomial, MeanField, TransitionSampler};
pub use crate::sim::{Simulator, Snapshot, TimeGrid, Trajectory};
pub use crate::trackers::Tracker;
pub use crate::{Real, Time};
pub(crate) use crate::{INF, NAN};
