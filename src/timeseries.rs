use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named indicator's history. Keyed by date, so dates are unique and
/// iteration is ascending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub name: String,
    pub entries: BTreeMap<NaiveDate, f64>,
}

impl TimeSeries {
    pub fn new(name: &str) -> Self {
        TimeSeries {
            name: String::from(name),
            entries: BTreeMap::new(),
        }
    }

    pub fn from_pairs<I>(name: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut series = TimeSeries::new(name);
        for (date, value) in pairs {
            series.insert(date, value);
        }
        series
    }

    /// Builds a series from raw text cells. Rows whose date does not parse are
    /// an error; rows whose value is not a finite number are dropped.
    pub fn from_text_rows<'a, I>(name: &str, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut series = TimeSeries::new(name);
        for (date, value) in rows {
            let date = parse_date(date)?;
            if let Some(value) = parse_value(value) {
                series.entries.insert(date, value);
            }
        }
        Ok(series)
    }

    /// Inserts `value` at `date`, replacing any previous value. Non-finite
    /// values are ignored.
    pub fn insert(&mut self, date: NaiveDate, value: f64) {
        if value.is_finite() {
            self.entries.insert(date, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.entries.keys().next().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.entries.keys().next_back().copied()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.entries.get(date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.entries.iter().map(|(d, v)| (*d, *v))
    }

    /// Entries with `start <= date <= end`; open bounds when `None`.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> TimeSeries {
        let entries = self
            .entries
            .iter()
            .filter(|(d, _)| start.map_or(true, |s| **d >= s) && end.map_or(true, |e| **d <= e))
            .map(|(d, v)| (*d, *v))
            .collect();
        TimeSeries {
            name: self.name.clone(),
            entries,
        }
    }
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    // Snapshots written by other tools may carry a time part.
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map_err(|e| Error::Parse(format!("invalid date `{}`: {}", text, e)))
}

/// Numeric coercion: anything that is not a finite float becomes `None`.
pub fn parse_value(text: &str) -> Option<f64> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
}
