use std::{fmt, str::FromStr};

use crate::{error::Error, frame::Frame};

/// How values are rescaled before they are charted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    #[default]
    Raw,
    /// Non-positive values become missing so the chart can use a log axis.
    Log,
    /// Per-column `(x - mean) / std`, sample standard deviation.
    ZScore,
}

impl ScaleMode {
    pub fn apply(self, frame: &Frame) -> Frame {
        let mut scaled = frame.clone();
        for index in 0..frame.columns.len() {
            let column = frame.column(index);
            let transformed = match self {
                ScaleMode::Raw => continue,
                ScaleMode::Log => log_column(&column),
                ScaleMode::ZScore => z_score_column(&column),
            };
            scaled.set_column(index, transformed);
        }
        scaled
    }

    pub fn uses_log_axis(self) -> bool {
        self == ScaleMode::Log
    }

    /// Lower-case form used in file names.
    pub fn slug(self) -> &'static str {
        match self {
            ScaleMode::Raw => "raw",
            ScaleMode::Log => "log",
            ScaleMode::ZScore => "zscore",
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScaleMode::Raw => "Raw",
            ScaleMode::Log => "Log",
            ScaleMode::ZScore => "Z-Score",
        };
        f.write_str(label)
    }
}

impl FromStr for ScaleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(ScaleMode::Raw),
            "log" => Ok(ScaleMode::Log),
            "z-score" | "zscore" | "z" => Ok(ScaleMode::ZScore),
            other => Err(Error::Parse(format!(
                "unknown scale `{}` (expected raw, log or z-score)",
                other
            ))),
        }
    }
}

pub fn log_column(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values.iter().map(|v| v.filter(|x| *x > 0.0)).collect()
}

/// Standardises the present values of a column. With fewer than two values,
/// or no spread at all, every cell becomes missing.
pub fn z_score_column(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len();
    if n < 2 || present.iter().all(|x| *x == present[0]) {
        return vec![None; values.len()];
    }

    let mean = present.iter().sum::<f64>() / n as f64;
    let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    if !std.is_finite() || std == 0.0 {
        return vec![None; values.len()];
    }

    values.iter().map(|v| v.map(|x| (x - mean) / std)).collect()
}
