//! One ingestion run: fetch, merge into the CSV snapshot, publish to the
//! relational store. Each series is handled on its own; a failure is logged
//! and recorded, and the run moves on to the next series.

use std::fmt;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::{
    config::Config,
    merge::next_cursor,
    snapshot::SnapshotDir,
    source::{fetch_named, SeriesSource},
    store::TableSink,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesOutcome {
    Updated { new_rows: usize, total_rows: usize },
    UpToDate,
    Failed(String),
}

impl fmt::Display for SeriesOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesOutcome::Updated { new_rows, total_rows } => {
                write!(f, "updated ({} fetched, {} total)", new_rows, total_rows)
            }
            SeriesOutcome::UpToDate => write!(f, "up-to-date"),
            SeriesOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct IngestReport {
    pub outcomes: Vec<(String, SeriesOutcome)>,
}

impl IngestReport {
    pub fn outcome(&self, name: &str) -> Option<&SeriesOutcome> {
        self.outcomes.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SeriesOutcome::Failed(_)))
            .count()
    }
}

/// Fetch strategy for a group of series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchMode {
    /// Ask only for dates after the snapshot's last row.
    Incremental,
    /// Ask for the whole history every time.
    Full,
}

pub struct Ingestor<'a> {
    snapshots: SnapshotDir,
    sink: &'a mut dyn TableSink,
    report: IngestReport,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &Config, sink: &'a mut dyn TableSink) -> Self {
        Ingestor {
            snapshots: SnapshotDir::new(&config.data_dir),
            sink,
            report: IngestReport::default(),
        }
    }

    /// Runs every `(name, code)` pair against `source`.
    pub fn ingest_all(&mut self, source: &dyn SeriesSource, series: &[(String, String)], mode: FetchMode) {
        for (name, code) in series {
            let outcome = self.ingest_one(source, name, code, mode);
            info!("{}: {}", name, outcome);
            self.report.outcomes.push((name.clone(), outcome));
        }
    }

    pub fn ingest_one(
        &mut self,
        source: &dyn SeriesSource,
        name: &str,
        code: &str,
        mode: FetchMode,
    ) -> SeriesOutcome {
        info!("Checking updates for {}...", name);

        let cursor: Option<NaiveDate> = match mode {
            FetchMode::Incremental => next_cursor(self.snapshots.latest_date(name)),
            FetchMode::Full => None,
        };

        let batch = match fetch_named(source, name, code, cursor) {
            Ok(batch) => batch,
            Err(e) => return SeriesOutcome::Failed(e.to_string()),
        };
        if batch.is_empty() {
            info!("{} already up-to-date.", name);
            return SeriesOutcome::UpToDate;
        }

        let combined = self.snapshots.merge_into(&batch);
        if let Err(e) = self.sink.replace_table(name, &combined) {
            error!("Error saving {} to the database: {}", name, e);
            return SeriesOutcome::Failed(e.to_string());
        }

        info!("Updated {} with {} new rows.", name, batch.len());
        SeriesOutcome::Updated {
            new_rows: batch.len(),
            total_rows: combined.len(),
        }
    }

    pub fn finish(self) -> IngestReport {
        self.report
    }
}

/// Incremental run over the FRED series, then a full refresh of the tickers.
pub fn run(
    config: &Config,
    fred: &dyn SeriesSource,
    prices: &dyn SeriesSource,
    sink: &mut dyn TableSink,
) -> IngestReport {
    let mut ingestor = Ingestor::new(config, sink);
    ingestor.ingest_all(fred, &config.fred_series, FetchMode::Incremental);
    ingestor.ingest_all(prices, &config.tickers, FetchMode::Full);
    let report = ingestor.finish();

    info!(
        "Ingest finished: {} series, {} failed",
        report.outcomes.len(),
        report.failures()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        source::fake::FakeSource,
        store::{memory::MemoryStore, UnavailableSink},
        timeseries::date,
    };

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            fred_series: vec![
                ("unemployment_rate".to_string(), "UNRATE".to_string()),
                ("cpi".to_string(), "CPIAUCSL".to_string()),
            ],
            tickers: vec![("sp500".to_string(), "^GSPC".to_string())],
            ..Config::default()
        }
    }

    #[test]
    fn first_run_fetches_everything_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let fred = FakeSource::default()
            .with("UNRATE", &[(date("2020-01-01"), 3.5), (date("2020-02-01"), 3.6)])
            .with("CPIAUCSL", &[(date("2020-01-01"), 258.0)]);
        let yahoo = FakeSource::default().with("^GSPC", &[(date("2020-01-02"), 3257.85)]);
        let mut store = MemoryStore::default();

        let report = run(&config, &fred, &yahoo, &mut store);

        assert_eq!(
            report.outcome("unemployment_rate"),
            Some(&SeriesOutcome::Updated { new_rows: 2, total_rows: 2 })
        );
        assert_eq!(report.failures(), 0);
        assert_eq!(store.replaced, vec!["unemployment_rate", "cpi", "sp500"]);
        assert_eq!(store.tables["sp500"].name, "sp500");
        assert!(dir.path().join("cpi.csv").exists());
        assert_eq!(fred.requests.borrow()[0], ("UNRATE".to_string(), None));
    }

    #[test]
    fn second_run_uses_the_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut store = MemoryStore::default();

        let fred = FakeSource::default().with("UNRATE", &[(date("2020-01-01"), 3.5)]);
        let yahoo = FakeSource::default();
        run(&config, &fred, &yahoo, &mut store);

        let fred = FakeSource::default()
            .with("UNRATE", &[(date("2020-01-01"), 9.9), (date("2020-02-01"), 3.6)]);
        let report = run(&config, &fred, &yahoo, &mut store);

        assert_eq!(
            fred.requests.borrow()[0],
            ("UNRATE".to_string(), Some(date("2020-01-02")))
        );
        assert_eq!(
            report.outcome("unemployment_rate"),
            Some(&SeriesOutcome::Updated { new_rows: 1, total_rows: 2 })
        );
        let table = &store.tables["unemployment_rate"];
        assert_eq!(table.get(&date("2020-01-01")), Some(3.5));
        assert_eq!(table.get(&date("2020-02-01")), Some(3.6));
        assert_eq!(report.outcome("cpi"), Some(&SeriesOutcome::UpToDate));
    }

    #[test]
    fn tickers_are_refetched_in_full_and_new_values_win() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut store = MemoryStore::default();
        let fred = FakeSource::default();

        let yahoo = FakeSource::default().with("^GSPC", &[(date("2020-01-02"), 3257.0)]);
        run(&config, &fred, &yahoo, &mut store);
        let yahoo = FakeSource::default()
            .with("^GSPC", &[(date("2020-01-02"), 3257.85), (date("2020-01-03"), 3234.85)]);
        run(&config, &fred, &yahoo, &mut store);

        assert_eq!(yahoo.requests.borrow()[0], ("^GSPC".to_string(), None));
        let table = &store.tables["sp500"];
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&date("2020-01-02")), Some(3257.85));
    }

    #[test]
    fn one_failing_series_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let fred = FakeSource::default()
            .failing("UNRATE")
            .with("CPIAUCSL", &[(date("2020-01-01"), 258.0)]);
        let yahoo = FakeSource::default().with("^GSPC", &[(date("2020-01-02"), 3257.85)]);
        let mut store = MemoryStore {
            fail_on: Some("cpi".to_string()),
            ..MemoryStore::default()
        };

        let report = run(&config, &fred, &yahoo, &mut store);

        assert!(matches!(
            report.outcome("unemployment_rate"),
            Some(SeriesOutcome::Failed(reason)) if reason.contains("UNRATE unavailable")
        ));
        assert!(matches!(report.outcome("cpi"), Some(SeriesOutcome::Failed(_))));
        assert_eq!(
            report.outcome("sp500"),
            Some(&SeriesOutcome::Updated { new_rows: 1, total_rows: 1 })
        );
        assert_eq!(report.failures(), 2);
        assert!(!dir.path().join("unemployment_rate.csv").exists());
        // The snapshot is still written even though publishing failed.
        assert!(dir.path().join("cpi.csv").exists());
    }

    #[test]
    fn unreachable_database_still_refreshes_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let fred = FakeSource::default()
            .with("UNRATE", &[(date("2020-01-01"), 3.5)])
            .with("CPIAUCSL", &[(date("2020-01-01"), 258.0)]);
        let yahoo = FakeSource::default().with("^GSPC", &[(date("2020-01-02"), 3257.85)]);
        let mut sink = UnavailableSink::new("connection refused");

        let report = run(&config, &fred, &yahoo, &mut sink);

        assert_eq!(report.failures(), 3);
        for name in ["unemployment_rate", "cpi", "sp500"] {
            assert!(dir.path().join(format!("{}.csv", name)).exists(), "{}", name);
        }
        let snapshots = SnapshotDir::new(dir.path());
        assert_eq!(snapshots.latest_date("cpi"), Some(date("2020-01-01")));
    }
}
