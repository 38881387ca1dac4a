//! Observation series and case data loading.
mod weekly;

pub use weekly::*;

use crate::{
    error::Error,
    prelude::{Real, Time},
    Result,
};
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, io::Write, path::Path};

/// Ordered (time index, count) pairs with strictly increasing time.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct ObservationSeries {
    times: Vec<Time>,
    cases: Vec<Real>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    time: Time,
    cases: Real,
}

impl ObservationSeries {
    /// Validate and build a series. Fails on empty input, unequal lengths,
    /// time stamps that do not strictly increase and non-finite counts.
    pub fn new(times: Vec<Time>, cases: Vec<Real>) -> Result<Self> {
        if times.len() != cases.len() {
            return Err(Error::SeriesMismatch {
                expected: times.len(),
                got: cases.len(),
            });
        }
        if times.is_empty() {
            return Err(Error::EmptySeries);
        }
        for (index, pair) in times.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(Error::NonMonotonic {
                    index: index + 1,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        if let Some((index, &value)) = cases.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            return Err(Error::InvalidCount { index, value });
        }
        Ok(ObservationSeries { times, cases })
    }

    /// Series indexed 1, 2, ..., n.
    pub fn from_counts(cases: Vec<Real>) -> Result<Self> {
        let times = (1..=cases.len() as Time).collect();
        Self::new(times, cases)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false for a validated series.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, Real)> + '_ {
        self.times.iter().copied().zip(self.cases.iter().copied())
    }

    /// Fail unless both series share the same time stamps.
    pub fn check_aligned(&self, other: &ObservationSeries) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::SeriesMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        for (index, (&expected, &got)) in self.times.iter().zip(&other.times).enumerate() {
            if expected != got {
                return Err(Error::TimeMismatch {
                    index,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Read a `time,cases` CSV file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(rdr);
        let mut times = vec![];
        let mut cases = vec![];
        for row in rdr.deserialize() {
            let row: Row = row?;
            times.push(row.time);
            cases.push(row.cases);
        }
        Self::new(times, cases)
    }

    /// Write as a `time,cases` CSV.
    pub fn to_writer<W: Write>(&self, out: W) -> Result<()> {
        let mut wrt = csv::Writer::from_writer(out);
        for (time, cases) in self.iter() {
            wrt.serialize(Row { time, cases })?;
        }
        wrt.flush()?;
        Ok(())
    }

    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_writer(File::create(path)?)
    }
}

/// Write observed and simulated series side by side as
/// `time,observed,simulated`.
pub fn write_comparison<W: Write>(
    observed: &ObservationSeries,
    simulated: &ObservationSeries,
    out: W,
) -> Result<()> {
    observed.check_aligned(simulated)?;
    let mut wrt = csv::Writer::from_writer(out);
    wrt.write_record(&["time", "observed", "simulated"])?;
    for ((t, y), (_, x)) in observed.iter().zip(simulated.iter()) {
        wrt.write_record(&[t.to_string(), y.to_string(), x.to_string()])?;
    }
    wrt.flush()?;
    Ok(())
}
