use chrono::{DateTime, NaiveDate, Utc};
use json::JsonValue;
use tracing::debug;

use crate::{
    config::Config,
    error::{Error, Result},
    source::{http_client, SeriesSource},
    timeseries::TimeSeries,
};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily closing prices from the Yahoo Finance chart endpoint.
pub struct Yahoo {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl Yahoo {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Yahoo {
            base_url: String::from(YAHOO_BASE_URL),
            client: http_client(config.timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, encode_ticker(ticker))
    }
}

impl SeriesSource for Yahoo {
    fn label(&self) -> &str {
        "Yahoo Finance"
    }

    fn fetch(&self, ticker: &str, cursor: Option<NaiveDate>) -> Result<TimeSeries> {
        let mut params = vec![("interval", String::from("1d"))];
        match cursor.and_then(|c| c.and_hms_opt(0, 0, 0)) {
            Some(start) => {
                params.push(("period1", start.and_utc().timestamp().to_string()));
                params.push(("period2", Utc::now().timestamp().to_string()));
            }
            None => params.push(("range", String::from("max"))),
        }

        let response = self.client.get(self.chart_url(ticker)).query(&params).send()?;
        let status = response.status();
        let body = response.text()?;
        debug!("Yahoo answered {} with {} bytes for {}", status, body.len(), ticker);

        // Yahoo reports unknown tickers as 404 with an error payload; prefer
        // its message over the bare status.
        match parse_chart(ticker, &body) {
            Err(Error::Json(_)) if !status.is_success() => {
                Err(Error::Api(format!("HTTP {} for {}", status, ticker)))
            }
            result => result,
        }
    }
}

/// Parses a chart response into closing prices keyed by exchange-local date.
/// Null closes are dropped; if several bars fall on one date the last wins.
pub fn parse_chart(name: &str, body: &str) -> Result<TimeSeries> {
    let parsed = json::parse(body)?;
    let chart = &parsed["chart"];

    let error = &chart["error"];
    if !error.is_null() {
        let description = error["description"].as_str().unwrap_or("unknown error");
        return Err(Error::Api(description.to_string()));
    }

    let result = &chart["result"][0];
    if result.is_null() {
        return Err(Error::Parse(String::from("chart response has no result")));
    }

    let timestamps = &result["timestamp"];
    let closes = &result["indicators"]["quote"][0]["close"];
    let gmt_offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let mut series = TimeSeries::new(name);
    if timestamps.is_null() {
        return Ok(series);
    }
    if timestamps.len() != closes.len() {
        return Err(Error::Parse(format!(
            "{} timestamps but {} closes",
            timestamps.len(),
            closes.len()
        )));
    }

    for (ts, close) in timestamps.members().zip(closes.members()) {
        let close = match close.as_f64() {
            Some(close) => close,
            None => continue,
        };
        let date = local_date(ts, gmt_offset)?;
        series.insert(date, close);
    }
    Ok(series)
}

fn local_date(ts: &JsonValue, gmt_offset: i64) -> Result<NaiveDate> {
    let secs = ts
        .as_i64()
        .ok_or_else(|| Error::Parse(format!("invalid timestamp `{}`", ts)))?;
    DateTime::from_timestamp(secs + gmt_offset, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| Error::Parse(format!("timestamp out of range `{}`", secs)))
}

fn encode_ticker(ticker: &str) -> String {
    ticker.replace('^', "%5E").replace('=', "%3D")
}
