use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::{error::Result, timeseries::TimeSeries};

const USER_AGENT: &str = concat!("rusty-macros/", env!("CARGO_PKG_VERSION"));

/// Anything that can hand out the history of a series by its provider code.
/// Implemented by the FRED and Yahoo clients, and by fakes in tests.
pub trait SeriesSource {
    /// Short provider label used in log lines.
    fn label(&self) -> &str;

    /// Observations for `code` on or after `cursor` (everything when `None`).
    fn fetch(&self, code: &str, cursor: Option<NaiveDate>) -> Result<TimeSeries>;
}

/// Fetches `code` and names the result `name`. Failures are logged and
/// returned.
pub fn fetch_named(
    source: &dyn SeriesSource,
    name: &str,
    code: &str,
    cursor: Option<NaiveDate>,
) -> Result<TimeSeries> {
    match cursor {
        Some(cursor) => info!("Fetching {} ({}) from {} starting {}", name, code, source.label(), cursor),
        None => info!("Fetching {} ({}) from {}", name, code, source.label()),
    }
    match source.fetch(code, cursor) {
        Ok(mut series) => {
            series.name = String::from(name);
            Ok(series)
        }
        Err(e) => {
            error!("Error fetching {} ({}) from {}: {}", name, code, source.label(), e);
            Err(e)
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
