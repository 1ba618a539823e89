//! Flat-file snapshots: one `date,value` CSV per series under the data dir.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    merge::merge,
    timeseries::{parse_date, parse_value, TimeSeries, DATE_FORMAT},
};

pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: &Path) -> Self {
        SnapshotDir {
            root: root.to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.csv", name))
    }

    /// `Ok(None)` when no snapshot exists yet.
    pub fn read(&self, name: &str) -> Result<Option<TimeSeries>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        read_snapshot(name, &path).map(Some)
    }

    pub fn write(&self, series: &TimeSeries) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        write_snapshot(series, &self.path_for(&series.name))
    }

    /// Last date stored for `name`. Unreadable snapshots are logged and
    /// treated as absent, which makes the next fetch a full one.
    pub fn latest_date(&self, name: &str) -> Option<NaiveDate> {
        match self.read(name) {
            Ok(Some(series)) => series.latest_date(),
            Ok(None) => None,
            Err(e) => {
                warn!("Error reading existing CSV for {}: {}", name, e);
                None
            }
        }
    }

    /// Merges `batch` into the stored snapshot and writes the result back.
    ///
    /// A snapshot that cannot be read is ignored and `batch` becomes the whole
    /// snapshot. A failed write is logged; the merged series is returned either
    /// way so the caller can still publish it.
    pub fn merge_into(&self, batch: &TimeSeries) -> TimeSeries {
        let existing = match self.read(&batch.name) {
            Ok(existing) => existing,
            Err(e) => {
                warn!(
                    "Error reading existing CSV for {}, replacing it with the new batch: {}",
                    batch.name, e
                );
                None
            }
        };

        let combined = merge(existing.as_ref(), batch);
        match self.write(&combined) {
            Ok(()) => debug!("Wrote {} rows to {}", combined.len(), self.path_for(&batch.name).display()),
            Err(e) => warn!("Error saving CSV for {}: {}", batch.name, e),
        }
        combined
    }
}

pub fn read_snapshot(name: &str, path: &Path) -> Result<TimeSeries> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);

    let headers = reader.headers()?.clone();
    let date_idx = column_index(&headers, "date", path)?;
    let value_idx = column_index(&headers, "value", path)?;

    let mut series = TimeSeries::new(name);
    for record in reader.records() {
        let record = record?;
        let date = match record.get(date_idx) {
            Some(d) => parse_date(d)?,
            None => continue,
        };
        if let Some(value) = record.get(value_idx).and_then(parse_value) {
            series.insert(date, value);
        }
    }
    Ok(series)
}

pub fn write_snapshot(series: &TimeSeries, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", "value"])?;
    for (date, value) in series.iter() {
        writer.write_record([date.format(DATE_FORMAT).to_string(), value.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn column_index(headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::Parse(format!("{} has no `{}` column", path.display(), column)))
}
