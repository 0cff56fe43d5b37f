/// Dated CSV snapshots.
///
/// One file per day, `<dir>/<prefix>_<YYYY-MM-DD>.csv`, with the header
/// row `Location,Water Level (Feet),Date & Time`. A second run on the same
/// day overwrites the earlier file.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::{Reading, ScrapeError, FILE_DATE_FORMAT};

/// Path of the snapshot for `date`.
pub fn snapshot_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_{}.csv", prefix, date.format(FILE_DATE_FORMAT)))
}

/// Writes `readings` to the snapshot for `date`, creating `dir` if needed.
///
/// # Errors
/// - `ScrapeError::NoData` when `readings` is empty; no file is created.
/// - `ScrapeError::Io` / `ScrapeError::Csv` when the file cannot be written.
pub fn write_snapshot(
    readings: &[Reading],
    dir: &Path,
    prefix: &str,
    date: NaiveDate,
) -> Result<PathBuf, ScrapeError> {
    if readings.is_empty() {
        return Err(ScrapeError::NoData);
    }

    fs::create_dir_all(dir)?;
    let path = snapshot_path(dir, prefix, date);

    let mut writer = csv::Writer::from_path(&path)?;
    for reading in readings {
        writer.serialize(reading)?;
    }
    writer.flush()?;

    info!(path = %path.display(), count = readings.len(), "data saved");
    Ok(path)
}

/// Reads a snapshot back into readings.
pub fn read_snapshot(path: &Path) -> Result<Vec<Reading>, ScrapeError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut readings = Vec::new();
    for row in reader.deserialize() {
        readings.push(row?);
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 12).expect("valid date")
    }

    fn sample() -> Vec<Reading> {
        vec![
            Reading::new("AJWA DAM", "211.45", "12-08-2025 10:15:00"),
            Reading::new("KALA GHODA", "7.25", "2025-08-12 11:30:00"),
        ]
    }

    #[test]
    fn test_snapshot_path_format() {
        let path = snapshot_path(Path::new("data"), "water_level_data", date());
        assert_eq!(path, PathBuf::from("data/water_level_data_2025-08-12.csv"));
    }

    #[test]
    fn test_write_creates_directory_and_header() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("nested").join("data");

        let path = write_snapshot(&sample(), &dir, "water_level_data", date()).expect("write");
        assert!(path.exists());

        let contents = fs::read_to_string(&path).expect("read back");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Location,Water Level (Feet),Date & Time"));
        assert_eq!(lines.next(), Some("AJWA DAM,211.45,12-08-2025 10:15:00"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_round_trip_through_reader() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = write_snapshot(&sample(), tmp.path(), "wl", date()).expect("write");
        assert_eq!(read_snapshot(&path).expect("read"), sample());
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let readings = vec![Reading::new("BRIDGE, EAST", "1.00", "x")];
        let path = write_snapshot(&readings, tmp.path(), "wl", date()).expect("write");

        let contents = fs::read_to_string(&path).expect("read back");
        assert!(contents.contains("\"BRIDGE, EAST\""));
        assert_eq!(read_snapshot(&path).expect("read"), readings);
    }

    #[test]
    fn test_empty_readings_write_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let result = write_snapshot(&[], tmp.path(), "wl", date());
        assert!(matches!(result, Err(ScrapeError::NoData)));
        assert!(!snapshot_path(tmp.path(), "wl", date()).exists());
    }

    #[test]
    fn test_same_day_overwrites() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_snapshot(&sample(), tmp.path(), "wl", date()).expect("first write");
        let second = vec![Reading::new("VADSAR BRIDGE", "3.30", "now")];
        let path = write_snapshot(&second, tmp.path(), "wl", date()).expect("second write");
        assert_eq!(read_snapshot(&path).expect("read"), second);
    }
}
