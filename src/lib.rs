//! Macroeconomic series ingestion (FRED, Yahoo Finance) with CSV snapshots,
//! a MySQL mirror and static comparison charts.

pub mod config;
pub mod correlation;
pub mod dashboard;
pub mod error;
pub mod frame;
pub mod fred;
pub mod ingest;
pub mod merge;
pub mod mysql_db;
pub mod scale;
pub mod snapshot;
pub mod source;
pub mod stockplotter;
pub mod store;
pub mod timeseries;
pub mod yahoo;

pub use config::Config;
pub use error::{Error, Result};
pub use timeseries::TimeSeries;
