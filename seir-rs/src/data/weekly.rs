use super::ObservationSeries;
use crate::{
    error::Error,
    prelude::{Real, Time},
    Result,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path};

const DAYS: usize = 7;

/// What to do with weeks whose cumulative count decreased (data
/// corrections). There is no default: the choice changes the fitted series
/// and has to be made explicitly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativePolicy {
    /// Replace negative differences by zero.
    Floor,
    /// Remove the week from the series. Its time index is skipped.
    Drop,
    /// Keep negative values as they are.
    Keep,
}

/// Weekly new cases from a daily cumulative series.
///
/// The cumulative count is read at the last day of every complete week and
/// differenced. The first complete week only serves as the baseline, so the
/// resulting series starts at index 1. Trailing days that do not complete a
/// week are ignored.
pub fn aggregate_weekly(cumulative: &[Real], policy: NegativePolicy) -> Result<ObservationSeries> {
    if let Some((index, &value)) = cumulative
        .iter()
        .enumerate()
        .find(|(_, x)| !(x.is_finite() && **x >= 0.0))
    {
        return Err(Error::InvalidCount { index, value });
    }
    let weekly: Vec<Real> = cumulative.chunks_exact(DAYS).map(|w| w[DAYS - 1]).collect();
    if weekly.len() < 2 {
        return Err(Error::EmptySeries);
    }

    let mut times = vec![];
    let mut cases = vec![];
    for (week, pair) in weekly.windows(2).enumerate() {
        let time = (week + 1) as Time;
        let diff = pair[1] - pair[0];
        if diff < 0.0 {
            warn!("negative weekly count {} at week {} ({:?})", diff, time, policy);
            match policy {
                NegativePolicy::Floor => {
                    times.push(time);
                    cases.push(0.0);
                }
                NegativePolicy::Drop => {}
                NegativePolicy::Keep => {
                    times.push(time);
                    cases.push(diff);
                }
            }
            continue;
        }
        times.push(time);
        cases.push(diff);
    }
    info!("aggregated {} days into {} weeks", cumulative.len(), times.len());
    ObservationSeries::new(times, cases)
}

/// Read one numeric column of a CSV file with headers. Empty cells are
/// skipped.
pub fn read_column<R: Read>(rdr: R, column: &str) -> Result<Vec<Real>> {
    let mut rdr = csv::Reader::from_reader(rdr);
    let index = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::Config(format!("column {} not found", column)))?;

    let mut values = vec![];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = record.get(index).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        let value = cell.parse::<Real>().map_err(|_| Error::InvalidCount {
            index: row,
            value: Real::NAN,
        })?;
        values.push(value);
    }
    return Ok(values);
}

/// Load a daily cumulative CSV and aggregate it into weekly new cases.
pub fn load_weekly<P: AsRef<Path>>(
    path: P,
    column: &str,
    policy: NegativePolicy,
) -> Result<ObservationSeries> {
    let daily = read_column(File::open(path)?, column)?;
    aggregate_weekly(&daily, policy)
}
