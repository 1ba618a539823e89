use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use toml::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const FRED_API_KEY_ENV: &str = "FRED_API_KEY";

const DEFAULT_FRED_SERIES: [(&str, &str); 11] = [
    ("fed_funds_rate", "FEDFUNDS"),
    ("m2_money_supply", "M2SL"),
    ("cpi", "CPIAUCSL"),
    ("unemployment_rate", "UNRATE"),
    ("real_gdp", "GDPC1"),
    ("personal_savings_rate", "PSAVERT"),
    ("10y_treasury_rate", "GS10"),
    ("2y_treasury_rate", "GS2"),
    ("yield_curve_10y_minus_2y", "T10Y2Y"),
    ("total_public_debt", "GFDEBTN"),
    ("inflation_expectations", "T10YIE"),
];

const DEFAULT_TICKERS: [(&str, &str); 1] = [("sp500", "^GSPC")];

/// Everything a run needs, loaded once and handed to the fetchers and the
/// ingest loop explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub fred_api_key: Option<String>,
    /// Series name -> FRED series code, in configuration order.
    pub fred_series: Vec<(String, String)>,
    /// Series name -> Yahoo ticker, in configuration order.
    pub tickers: Vec<(String, String)>,
    pub data_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub mysql_url: String,
    pub timeout: Duration,
    /// Series every indicator is compared against in charts and correlations.
    pub benchmark: String,
    pub img_width: u32,
    pub img_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fred_api_key: None,
            fred_series: pairs(&DEFAULT_FRED_SERIES),
            tickers: pairs(&DEFAULT_TICKERS),
            data_dir: PathBuf::from("data"),
            charts_dir: PathBuf::from("charts"),
            mysql_url: String::from("mysql://root@localhost:3306/macros"),
            timeout: Duration::from_secs(10),
            benchmark: String::from("sp500"),
            img_width: 1600,
            img_height: 900,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    /// The FRED key from the environment takes precedence over the file.
    pub fn read_config(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Config::from_toml_str(&contents)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        if let Ok(key) = std::env::var(FRED_API_KEY_ENV) {
            if !key.is_empty() {
                config.fred_api_key = Some(key);
            }
        }
        if config.fred_api_key.is_none() {
            warn!("No FRED API key configured; set {} or fred_api_key", FRED_API_KEY_ENV);
        }
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config_toml = match toml::from_str::<Value>(contents) {
            Ok(toml) => toml,
            Err(error) => {
                return Err(Error::Config(format!(
                    "Please check your config.toml syntax: {}",
                    error
                )))
            }
        };

        let mut config = Config::default();

        if let Some(key) = get_str(&config_toml, "fred_api_key")? {
            if !key.is_empty() {
                config.fred_api_key = Some(key.to_string());
            }
        }
        if let Some(dir) = get_str(&config_toml, "data_dir")? {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get_str(&config_toml, "charts_dir")? {
            config.charts_dir = PathBuf::from(dir);
        }
        if let Some(url) = get_str(&config_toml, "mysql_url")? {
            config.mysql_url = url.to_string();
        }
        if let Some(benchmark) = get_str(&config_toml, "benchmark")? {
            config.benchmark = benchmark.to_string();
        }
        if let Some(secs) = get_positive_int(&config_toml, "timeout_secs")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(width) = get_positive_int(&config_toml, "img_width")? {
            config.img_width = width as u32;
        }
        if let Some(height) = get_positive_int(&config_toml, "img_height")? {
            config.img_height = height as u32;
        }
        if let Some(series) = get_table(&config_toml, "fred_series")? {
            config.fred_series = series;
        }
        if let Some(tickers) = get_table(&config_toml, "tickers")? {
            config.tickers = tickers;
        }

        if config.fred_series.iter().any(|(name, _)| *name == config.benchmark) {
            return Err(Error::Config(format!(
                "benchmark `{}` is also listed in [fred_series]",
                config.benchmark
            )));
        }

        Ok(config)
    }

    /// Names of every configured series, FRED first.
    pub fn series_names(&self) -> Vec<String> {
        self.fred_series
            .iter()
            .chain(self.tickers.iter())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn indicator_names(&self) -> Vec<String> {
        self.fred_series.iter().map(|(name, _)| name.clone()).collect()
    }
}

fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect()
}

fn get_str<'a>(toml: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match toml.get(key) {
        Some(value) => match value.as_str() {
            Some(s) => Ok(Some(s)),
            None => Err(Error::Config(format!("`{}` must be a string", key))),
        },
        None => Ok(None),
    }
}

fn get_positive_int(toml: &Value, key: &str) -> Result<Option<u64>> {
    match toml.get(key) {
        Some(value) => match value.as_integer() {
            Some(n) if n > 0 && n <= u32::MAX as i64 => Ok(Some(n as u64)),
            _ => Err(Error::Config(format!("`{}` must be a positive integer", key))),
        },
        None => Ok(None),
    }
}

fn get_table(toml: &Value, key: &str) -> Result<Option<Vec<(String, String)>>> {
    let table = match toml.get(key) {
        Some(value) => match value.as_table() {
            Some(table) => table,
            None => return Err(Error::Config(format!("`{}` must be a table", key))),
        },
        None => return Ok(None),
    };

    let mut entries = Vec::with_capacity(table.len());
    for (name, code) in table {
        match code.as_str() {
            Some(code) => entries.push((name.clone(), code.to_string())),
            None => {
                return Err(Error::Config(format!(
                    "`{}.{}` must be a string",
                    key, name
                )))
            }
        }
    }
    Ok(Some(entries))
}
