//! Static stand-in for the interactive dashboard: builds the joined frames,
//! scales them and hands them to the plotter.

use std::{fmt::Write, path::PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    config::Config,
    correlation::correlate_against,
    error::{Error, Result},
    frame::Frame,
    scale::ScaleMode,
    stockplotter::StockPlotter,
    store::SeriesStore,
    timeseries::{TimeSeries, DATE_FORMAT},
};

#[derive(Debug, Clone, Default)]
pub struct PlotRequest {
    /// Indicators to draw; every configured indicator when empty.
    pub indicators: Vec<String>,
    pub scale: ScaleMode,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub struct Dashboard<'a> {
    config: &'a Config,
    store: &'a mut dyn SeriesStore,
}

impl<'a> Dashboard<'a> {
    pub fn new(config: &'a Config, store: &'a mut dyn SeriesStore) -> Self {
        Dashboard { config, store }
    }

    fn load(&mut self, name: &str) -> Result<TimeSeries> {
        let series = self.store.load(name)?;
        if series.is_empty() {
            warn!("No data stored for {}", name);
        }
        Ok(series)
    }

    /// Outer join of `indicators`, inner-joined with the benchmark.
    pub fn comparison_frame(&mut self, indicators: &[String]) -> Result<Frame> {
        let mut loaded = Vec::with_capacity(indicators.len());
        for name in indicators {
            loaded.push(self.load(name)?);
        }
        let config = self.config;
        let benchmark = self.load(&config.benchmark)?;

        let macro_all = Frame::outer_join_all(&loaded);
        Ok(macro_all.inner_join(&Frame::from_series(&benchmark)))
    }

    /// Selected indicators plus the benchmark over the requested dates, rows
    /// with gaps removed, then scaled.
    pub fn scaled_frame(&mut self, request: &PlotRequest) -> Result<Frame> {
        let indicators = self.resolve_indicators(&request.indicators)?;
        let full = self.comparison_frame(&indicators)?;

        let mut columns = indicators;
        columns.push(self.config.benchmark.clone());
        let plot_frame = full
            .select(&columns)?
            .between(request.start, request.end)
            .drop_incomplete();

        Ok(request.scale.apply(&plot_frame))
    }

    pub fn plot_comparison(&mut self, request: &PlotRequest) -> Result<PathBuf> {
        let frame = self.scaled_frame(request)?;
        if frame.is_empty() {
            return Err(Error::Chart(format!(
                "No overlapping data for the selected indicators and {}",
                self.config.benchmark
            )));
        }

        let stem = chart_stem(request, &frame);
        let title = format!("Macroeconomic indicators vs. {} ({})", self.config.benchmark, request.scale);

        info!("Plotting {} rows of {} columns", frame.len(), frame.columns.len());
        StockPlotter::from_config(self.config).plot_frame(&frame, request.scale, &title, &stem)
    }

    /// One indicator against the benchmark on shared dates, unscaled.
    pub fn plot_pair(&mut self, indicator: &str) -> Result<PathBuf> {
        let indicators = self.resolve_indicators(&[indicator.to_string()])?;
        let frame = self.comparison_frame(&indicators)?;
        if frame.is_empty() {
            return Err(Error::Chart(format!(
                "No data available for {} or {}",
                indicator, self.config.benchmark
            )));
        }

        let title = format!("{} vs. {}", indicator, self.config.benchmark);
        let stem = format!("{}_vs_{}", indicator, self.config.benchmark);
        StockPlotter::from_config(self.config).plot_frame(&frame, ScaleMode::Raw, &title, &stem)
    }

    /// Pearson correlation of every indicator with the benchmark, over the
    /// dates the benchmark has data for.
    pub fn correlations(&mut self) -> Result<Vec<(String, Option<f64>)>> {
        let indicators = self.config.indicator_names();
        let full = self.comparison_frame(&indicators)?;
        correlate_against(&full, &self.config.benchmark)
            .ok_or_else(|| Error::InvalidName(self.config.benchmark.clone()))
    }

    fn resolve_indicators(&self, requested: &[String]) -> Result<Vec<String>> {
        let known = self.config.indicator_names();
        if requested.is_empty() {
            return Ok(known);
        }
        for name in requested {
            if !known.contains(name) {
                return Err(Error::InvalidName(format!("unknown indicator `{}`", name)));
            }
        }
        Ok(requested.to_vec())
    }
}

/// `{scale}_{start}_{end}`, taking each bound from the request and falling
/// back to the frame's first or last date.
fn chart_stem(request: &PlotRequest, frame: &Frame) -> String {
    let day = |d: Option<NaiveDate>| d.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default();
    format!(
        "{}_{}_{}",
        request.scale.slug(),
        day(request.start.or_else(|| frame.dates().next())),
        day(request.end.or_else(|| frame.dates().next_back()))
    )
}

pub fn format_correlations(table: &[(String, Option<f64>)], benchmark: &str) -> String {
    let width = table.iter().map(|(n, _)| n.len()).max().unwrap_or(0).max(9);
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  pearson vs {}", "indicator", benchmark, width = width);
    for (name, r) in table {
        match r {
            Some(r) => {
                let _ = writeln!(out, "{:<width$}  {:>7.3}", name, r, width = width);
            }
            None => {
                let _ = writeln!(out, "{:<width$}  {:>7}", name, "n/a", width = width);
            }
        }
    }
    out
}
