//! Time grid, simulator and trajectory export.
mod grid;
mod simulator;

pub use grid::*;
pub use simulator::*;

use crate::{models::CompartmentState, prelude::Real, Result};
use ndarray::Array2;
use std::io::Write;

/// Stack snapshots into a matrix with columns time, compartments (in label
/// order) and accumulated flow.
pub fn to_array<S: CompartmentState>(snapshots: &[Snapshot<S>]) -> Array2<Real> {
    let ncols = S::LABELS.len() + 2;
    let mut data = Array2::zeros((snapshots.len(), ncols));
    for (mut row, snapshot) in data.outer_iter_mut().zip(snapshots) {
        row[0] = snapshot.time as Real;
        for (j, x) in snapshot.state.to_vec().into_iter().enumerate() {
            row[j + 1] = x;
        }
        row[ncols - 1] = snapshot.accumulated;
    }
    return data;
}

/// Write snapshots as CSV with header `time,<labels>,accumulated`.
pub fn write_csv<S: CompartmentState, W: Write>(snapshots: &[Snapshot<S>], out: W) -> Result<()> {
    let mut wrt = csv::Writer::from_writer(out);
    let mut header = vec!["time"];
    header.extend(S::LABELS.iter().copied());
    header.push("accumulated");
    wrt.write_record(&header)?;
    for snapshot in snapshots {
        let mut record = vec![snapshot.time.to_string()];
        record.extend(snapshot.state.to_vec().iter().map(|x| x.to_string()));
        record.push(snapshot.accumulated.to_string());
        wrt.write_record(&record)?;
    }
    wrt.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SirState;

    fn snapshots() -> Vec<Snapshot<SirState>> {
        vec![
            Snapshot {
                time: 1,
                state: SirState { s: 9.0, i: 1.0, r: 0.0 },
                accumulated: 0.0,
            },
            Snapshot {
                time: 2,
                state: SirState { s: 7.0, i: 2.0, r: 1.0 },
                accumulated: 1.0,
            },
        ]
    }

    #[test]
    fn array_layout() {
        let arr = to_array(&snapshots());
        assert_eq!(arr.shape(), &[2, 5]);
        assert_eq!(arr[[1, 0]], 2.0);
        assert_eq!(arr[[1, 1]], 7.0);
        assert_eq!(arr[[1, 4]], 1.0);
    }

    #[test]
    fn csv_layout() {
        let mut buf = vec![];
        write_csv(&snapshots(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,S,I,R,accumulated"));
        assert_eq!(lines.next(), Some("1,9,1,0,0"));
    }
}
