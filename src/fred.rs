use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::Config,
    error::{Error, Result},
    source::{http_client, SeriesSource},
    timeseries::{TimeSeries, DATE_FORMAT},
};

pub const FRED_BASE_URL: &str = "https://api.stlouisfed.org";

/// Client for the FRED `series/observations` endpoint.
pub struct Fred {
    key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl Fred {
    pub fn with_key(key: &str, config: &Config) -> Result<Self> {
        Ok(Fred {
            key: String::from(key),
            base_url: String::from(FRED_BASE_URL),
            client: http_client(config.timeout)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.fred_api_key {
            Some(key) => Fred::with_key(key, config),
            None => Err(Error::Config(String::from("FRED API key is not set"))),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn observations_url(&self) -> String {
        format!("{}/fred/series/observations", self.base_url)
    }
}

impl SeriesSource for Fred {
    fn label(&self) -> &str {
        "FRED"
    }

    fn fetch(&self, code: &str, cursor: Option<NaiveDate>) -> Result<TimeSeries> {
        let mut params = vec![
            ("series_id", code.to_string()),
            ("api_key", self.key.clone()),
            ("file_type", String::from("json")),
        ];
        if let Some(cursor) = cursor {
            params.push(("observation_start", cursor.format(DATE_FORMAT).to_string()));
        }

        let body = self
            .client
            .get(self.observations_url())
            .query(&params)
            .send()?
            .error_for_status()?
            .text()?;
        debug!("FRED answered {} bytes for {}", body.len(), code);

        parse_observations(code, &body)
    }
}

/// Parses an observations response body. Missing values (FRED sends `"."`)
/// are dropped; a response without an `observations` array is empty.
pub fn parse_observations(name: &str, body: &str) -> Result<TimeSeries> {
    let parsed = json::parse(body)?;

    if let Some(message) = parsed["error_message"].as_str() {
        return Err(Error::Api(message.to_string()));
    }

    let observations = &parsed["observations"];
    if observations.is_null() {
        return Ok(TimeSeries::new(name));
    }
    if !observations.is_array() {
        return Err(Error::Parse(String::from("`observations` is not an array")));
    }

    let mut rows = Vec::with_capacity(observations.len());
    for obs in observations.members() {
        let date = obs["date"]
            .as_str()
            .ok_or_else(|| Error::Parse(String::from("observation without a date")))?;
        rows.push((date, obs["value"].as_str().unwrap_or("")));
    }
    TimeSeries::from_text_rows(name, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::date;

    const BODY: &str = r#"{
        "realtime_start": "2024-05-01",
        "count": 3,
        "observations": [
            {"realtime_start": "2024-05-01", "date": "2024-01-01", "value": "5.33"},
            {"realtime_start": "2024-05-01", "date": "2024-02-01", "value": "."},
            {"realtime_start": "2024-05-01", "date": "2024-03-01", "value": "5.33"}
        ]
    }"#;

    #[test]
    fn observations_are_parsed_and_missing_dropped() {
        let ts = parse_observations("FEDFUNDS", BODY).unwrap();
        assert_eq!(ts.name, "FEDFUNDS");
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.get(&date("2024-01-01")), Some(5.33));
        assert_eq!(ts.get(&date("2024-02-01")), None);
    }

    #[test]
    fn empty_or_absent_observations() {
        assert!(parse_observations("X", r#"{"observations": []}"#).unwrap().is_empty());
        assert!(parse_observations("X", r#"{"count": 0}"#).unwrap().is_empty());
    }

    #[test]
    fn api_error_payload() {
        let body = r#"{"error_code": 400, "error_message": "Bad Request.  The value for variable api_key is not registered."}"#;
        assert!(matches!(parse_observations("X", body), Err(Error::Api(_))));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(parse_observations("X", "<html>"), Err(Error::Json(_))));
    }

    #[test]
    fn base_url_override() {
        let config = Config::default();
        let fred = Fred::with_key("k", &config).unwrap().with_base_url("http://127.0.0.1:9/");
        assert_eq!(fred.observations_url(), "http://127.0.0.1:9/fred/series/observations");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = Config::default();
        assert!(matches!(Fred::from_config(&config), Err(Error::Config(_))));
    }
}
