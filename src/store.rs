use crate::{
    error::{Error, Result},
    snapshot::SnapshotDir,
    timeseries::TimeSeries,
};

/// Destination that keeps the latest full copy of each series.
pub trait TableSink {
    /// Replaces everything stored under `name` with `series`.
    fn replace_table(&mut self, name: &str, series: &TimeSeries) -> Result<()>;
}

/// Somewhere the renderer can load a series back from.
pub trait SeriesStore {
    fn load(&mut self, name: &str) -> Result<TimeSeries>;
}

/// Stands in for a database that could not be opened, so the rest of an
/// ingest run still refreshes the snapshots. Every write fails with the
/// original connection error.
pub struct UnavailableSink {
    reason: String,
}

impl UnavailableSink {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableSink { reason: reason.into() }
    }
}

impl TableSink for UnavailableSink {
    fn replace_table(&mut self, _name: &str, _series: &TimeSeries) -> Result<()> {
        Err(Error::Unavailable(self.reason.clone()))
    }
}

impl SeriesStore for SnapshotDir {
    /// A missing snapshot loads as an empty series.
    fn load(&mut self, name: &str) -> Result<TimeSeries> {
        Ok(self.read(name)?.unwrap_or_else(|| TimeSeries::new(name)))
    }
}
