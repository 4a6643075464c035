//! Reader and writer for the row-oriented interchange representation.
//!
//! Interchange files are headerless text, one `timestamp,value` row per
//! sample. They are the exported form of a ring buffer and the input to the
//! merge. Reading applies the import cutoff; writing (the export projector)
//! skips slots the appliance never filled.

use std::path::Path;

use tracing::warn;

use crate::cutoff::Cutoff;
use crate::error::TransferResult;
use crate::sample::Sample;

/// Read an interchange file into parallel time and value sequences.
///
/// Rows with a timestamp beyond the cutoff are dropped silently; they are
/// data newer than the import boundary, not an error. Rows that do not parse
/// as a `timestamp,value` pair of the expected kind are skipped with a
/// warning.
pub fn read_series<T: Sample>(path: &Path, cutoff: Cutoff) -> TransferResult<(Vec<i64>, Vec<T>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut times = Vec::new();
    let mut values = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        match parse_row::<T>(&record) {
            Some((t, value)) => {
                if cutoff.includes(t) {
                    times.push(t);
                    values.push(value);
                }
            }
            None => warn!(
                row = row + 1,
                path = %path.display(),
                "skipping malformed interchange row"
            ),
        }
    }

    Ok((times, values))
}

fn parse_row<T: Sample>(record: &csv::StringRecord) -> Option<(i64, T)> {
    if record.len() != 2 {
        return None;
    }
    let t = record.get(0)?.parse::<i64>().ok()?;
    let value = T::parse_field(record.get(1)?)?;
    Some((t, value))
}

/// Project a ring buffer's contents into interchange rows.
///
/// Emits one row per slot whose value is not the unfilled sentinel for its
/// kind, in physical slot order. Returns the number of rows written.
pub fn write_series<T: Sample>(path: &Path, times: &[i64], values: &[T]) -> TransferResult<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0usize;

    for (&t, &value) in times.iter().zip(values.iter()) {
        if value.is_unfilled() {
            continue;
        }
        writer.write_record([t.to_string(), value.format_field()])?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_integer_rows_with_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        fs::write(&path, "100,5\n110,7\n120,9\n").unwrap();

        let (times, values) =
            read_series::<i32>(&path, Cutoff::from_timestamp(110)).unwrap();
        assert_eq!(times, vec![100, 110]);
        assert_eq!(values, vec![5, 7]);
    }

    #[test]
    fn tolerates_space_padded_rows() {
        // Files written by the appliance's earlier exporter pad after the
        // comma.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        fs::write(&path, "100, 5\n110, 7\n").unwrap();

        let (times, values) = read_series::<i32>(&path, Cutoff::UNLIMITED).unwrap();
        assert_eq!(times, vec![100, 110]);
        assert_eq!(values, vec![5, 7]);
    }

    #[test]
    fn skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        fs::write(&path, "100,5\nnot-a-row\n110,banana\n120,9,extra\n130,11\n").unwrap();

        let (times, values) = read_series::<i32>(&path, Cutoff::UNLIMITED).unwrap();
        assert_eq!(times, vec![100, 130]);
        assert_eq!(values, vec![5, 11]);
    }

    #[test]
    fn reads_float_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        fs::write(&path, "100,1.500\n110,2.250\n").unwrap();

        let (times, values) = read_series::<f64>(&path, Cutoff::UNLIMITED).unwrap();
        assert_eq!(times, vec![100, 110]);
        assert_eq!(values, vec![1.5, 2.25]);
    }

    #[test]
    fn export_skips_unfilled_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let times = vec![90, 100, 110];
        let values = vec![5i32, i32::MAX, 9];
        let written = write_series(&path, &times, &values).unwrap();
        assert_eq!(written, 2);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "90,5\n110,9\n");
    }

    #[test]
    fn export_formats_floats_with_three_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let times = vec![90, 100];
        let values = vec![1.5f64, f64::NAN];
        write_series(&path, &times, &values).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "90,1.500\n");
    }

    #[test]
    fn export_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round.csv");

        let times = vec![100, 110, 120];
        let values = vec![2.5f64, 3.125, 4.0];
        write_series(&path, &times, &values).unwrap();

        let (back_t, back_v) = read_series::<f64>(&path, Cutoff::UNLIMITED).unwrap();
        assert_eq!(back_t, times);
        assert_eq!(back_v, vec![2.5, 3.125, 4.0]);
    }
}
