use crate::{prelude::Real, trackers::Tracker, Result};
use getset::Getters;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path};

/// One objective evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Evaluation index, starting at 0.
    pub iteration: u64,
    /// Free parameter values.
    pub params: Vec<Real>,
    pub cost: Real,
}

/// Append-only log of every evaluation performed by an optimizer.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Trace {
    names: Vec<String>,
    records: Vec<TraceRecord>,
}

impl Trace {
    pub fn new(names: &[String]) -> Self {
        Trace {
            names: names.to_vec(),
            records: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record with the lowest cost. The first one wins ties.
    pub fn best(&self) -> Option<&TraceRecord> {
        self.records
            .iter()
            .filter(|r| !r.cost.is_nan())
            .fold(None, |best: Option<&TraceRecord>, r| match best {
                Some(b) if b.cost <= r.cost => Some(b),
                _ => Some(r),
            })
    }

    /// Matrix with one row per evaluation: iteration, parameters, cost.
    pub fn to_array(&self) -> Array2<Real> {
        let ncols = self.names.len() + 2;
        let mut data = Array2::from_elem((self.records.len(), ncols), Real::NAN);
        for (mut row, rec) in data.outer_iter_mut().zip(&self.records) {
            row[0] = rec.iteration as Real;
            for (j, &x) in rec.params.iter().take(self.names.len()).enumerate() {
                row[j + 1] = x;
            }
            row[ncols - 1] = rec.cost;
        }
        data
    }

    /// Write as CSV with header `iteration,<names>,cost`.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut wrt = csv::Writer::from_writer(out);
        let mut header = vec!["iteration".to_string()];
        header.extend(self.names.iter().cloned());
        header.push("cost".to_string());
        wrt.write_record(&header)?;
        for rec in &self.records {
            let mut row = vec![rec.iteration.to_string()];
            row.extend(rec.params.iter().map(|x| x.to_string()));
            row.push(rec.cost.to_string());
            wrt.write_record(&row)?;
        }
        wrt.flush()?;
        Ok(())
    }

    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}

impl Tracker<TraceRecord> for Trace {
    fn track(&mut self, value: &TraceRecord) {
        self.records.push(value.clone());
    }
}
