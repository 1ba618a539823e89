use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use plotters::{
    prelude::{BitMapBackend, ChartBuilder, IntoDrawingArea, IntoLogRange, LineSeries, PathElement},
    style::{Color, IntoFont, RGBColor, BLACK, WHITE},
};
use tracing::info;

use crate::{
    config::Config,
    error::{Error, Result},
    frame::Frame,
    scale::ScaleMode,
};

/// Colour-blind friendly palette, cycled per column.
const ACCESSIBLE_COLORS: [&str; 20] = [
    "#E69F00", "#56B4E9", "#009E73", "#F0E442", "#0072B2", "#D55E00", "#CC79A7",
    "#999999", "#000000", "#882255", "#44AA99", "#117733", "#332288", "#AA4499",
    "#DDCC77", "#88CCEE", "#999933", "#661100", "#6699CC", "#CC6677",
];

/// Shared by the linear and logarithmic charts, whose coordinate types differ.
macro_rules! draw_lines {
    ($chart:ident, $frame:expr, $y_desc:expr) => {{
        $chart
            .configure_mesh()
            .x_desc("date")
            .y_desc($y_desc)
            .draw()
            .map_err(chart_err)?;
        for (index, name) in $frame.columns.iter().enumerate() {
            let color = palette(index);
            $chart
                .draw_series(LineSeries::new($frame.points(index), &color))
                .map_err(chart_err)?
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
        $chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_err)?;
    }};
}

pub struct StockPlotter {
    img_width: u32,
    img_height: u32,
    charts_dir: PathBuf,
}

impl StockPlotter {
    pub fn new(img_width: u32, img_height: u32, charts_dir: &Path) -> Self {
        StockPlotter {
            img_width,
            img_height,
            charts_dir: charts_dir.to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        StockPlotter::new(config.img_width, config.img_height, &config.charts_dir)
    }

    /// Draws every column of an already scaled `frame` as one line and
    /// returns the written PNG's path.
    pub fn plot_frame(&self, frame: &Frame, mode: ScaleMode, title: &str, file_stem: &str) -> Result<PathBuf> {
        let (start, end) = date_range(frame)?;
        let (y_min, y_max) = value_range(frame, mode)?;

        std::fs::create_dir_all(&self.charts_dir)?;
        let path = self.charts_dir.join(format!("{}.png", file_stem));

        let root = BitMapBackend::new(&path, (self.img_width, self.img_height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut builder = ChartBuilder::on(&root);
        builder
            .caption(title, ("sans-serif", 40).into_font())
            .x_label_area_size(60)
            .y_label_area_size(80)
            .margin(20);

        if mode.uses_log_axis() {
            let mut chart = builder
                .build_cartesian_2d(start..end, (y_min..y_max).log_scale())
                .map_err(chart_err)?;
            draw_lines!(chart, frame, "value (log)");
        } else {
            let mut chart = builder
                .build_cartesian_2d(start..end, y_min..y_max)
                .map_err(chart_err)?;
            draw_lines!(chart, frame, y_label(mode));
        }

        root.present().map_err(chart_err)?;
        drop(root);
        info!("Wrote chart {}", path.display());
        Ok(path)
    }
}

fn y_label(mode: ScaleMode) -> &'static str {
    match mode {
        ScaleMode::ZScore => "z-score",
        _ => "value",
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Chart(e.to_string())
}

pub fn palette(index: usize) -> RGBColor {
    let hex = ACCESSIBLE_COLORS[index % ACCESSIBLE_COLORS.len()];
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    RGBColor(channel(1), channel(3), channel(5))
}

fn date_range(frame: &Frame) -> Result<(NaiveDate, NaiveDate)> {
    let mut dates = frame.dates();
    let start = dates
        .next()
        .ok_or_else(|| Error::Chart(String::from("nothing to plot")))?;
    let end = dates.next_back().unwrap_or(start);
    if start == end {
        // Single-day frames still need a non-empty axis.
        let next = end.succ_opt().unwrap_or(end);
        return Ok((start, next));
    }
    Ok((start, end))
}

fn value_range(frame: &Frame, mode: ScaleMode) -> Result<(f64, f64)> {
    let values: Vec<f64> = frame
        .rows
        .values()
        .flatten()
        .flatten()
        .copied()
        .filter(|v| !mode.uses_log_axis() || *v > 0.0)
        .collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return Err(Error::Chart(String::from("no values to plot")));
    }

    if mode.uses_log_axis() {
        return Ok((min * 0.9, max * 1.1));
    }
    let pad = if max > min { (max - min) * 0.05 } else { min.abs().max(1.0) * 0.05 };
    Ok((min - pad, max + pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::{date, TimeSeries};

    fn frame(rows: &[(&str, f64)]) -> Frame {
        Frame::from_series(&TimeSeries::from_pairs("x", rows.iter().map(|(d, v)| (date(d), *v))))
    }

    #[test]
    fn palette_parses_hex() {
        assert_eq!(palette(0), RGBColor(0xE6, 0x9F, 0x00));
        assert_eq!(palette(ACCESSIBLE_COLORS.len() + 1), palette(1));
    }

    #[test]
    fn ranges_are_padded() {
        let f = frame(&[("2020-01-01", 10.0), ("2020-01-05", 20.0)]);
        assert_eq!(date_range(&f).unwrap(), (date("2020-01-01"), date("2020-01-05")));
        let (lo, hi) = value_range(&f, ScaleMode::Raw).unwrap();
        assert!((lo - 9.5).abs() < 1e-9 && (hi - 20.5).abs() < 1e-9);

        let single = frame(&[("2020-01-01", 3.0)]);
        assert_eq!(date_range(&single).unwrap(), (date("2020-01-01"), date("2020-01-02")));
        let (lo, hi) = value_range(&single, ScaleMode::Raw).unwrap();
        assert!(lo < 3.0 && hi > 3.0);
    }

    #[test]
    fn log_range_ignores_non_positive() {
        let mut f = frame(&[("2020-01-01", 10.0), ("2020-01-02", 100.0)]);
        f.set_column(0, vec![None, Some(100.0)]);
        let (lo, hi) = value_range(&f, ScaleMode::Log).unwrap();
        assert!(lo > 0.0 && lo < 100.0 && hi > 100.0);
    }

    #[test]
    fn plot_frame_writes_into_charts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let charts = dir.path().join("charts");
        let plotter = StockPlotter::new(320, 240, &charts);
        let f = frame(&[("2020-01-01", 10.0), ("2020-01-02", 12.0), ("2020-01-03", 11.0)]);

        // Text rendering needs a system font; without one plotters reports a
        // chart error instead of a file.
        match plotter.plot_frame(&f, ScaleMode::Log, "test", "log_small") {
            Ok(path) => {
                assert_eq!(path, charts.join("log_small.png"));
                assert!(path.exists());
            }
            Err(e) => assert!(matches!(e, Error::Chart(_)), "{}", e),
        }
        assert!(charts.is_dir());
    }

    #[test]
    fn empty_frame_is_an_error() {
        assert!(date_range(&Frame::default()).is_err());
        let mut f = frame(&[("2020-01-01", 1.0)]);
        f.set_column(0, vec![None]);
        assert!(value_range(&f, ScaleMode::Raw).is_err());
    }
}
