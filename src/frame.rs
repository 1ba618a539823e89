use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    error::{Error, Result},
    timeseries::TimeSeries,
};

/// Several series aligned on date. Each row has one cell per column;
/// `None` marks a date the column has no value for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl Frame {
    pub fn from_series(series: &TimeSeries) -> Self {
        Frame {
            columns: vec![series.name.clone()],
            rows: series.iter().map(|(d, v)| (d, vec![Some(v)])).collect(),
        }
    }

    /// Full outer join of every series, in the given column order.
    pub fn outer_join_all(series: &[TimeSeries]) -> Self {
        series
            .iter()
            .map(Frame::from_series)
            .reduce(|acc, next| acc.outer_join(&next))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, index: usize) -> Vec<Option<f64>> {
        self.rows.values().map(|row| row[index]).collect()
    }

    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Rows for every date in either frame.
    pub fn outer_join(&self, other: &Frame) -> Frame {
        let width = self.columns.len();
        let other_width = other.columns.len();

        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (date, row) in &self.rows {
            let mut joined = row.clone();
            joined.resize(width + other_width, None);
            rows.insert(*date, joined);
        }
        for (date, row) in &other.rows {
            let joined = rows.entry(*date).or_insert_with(|| vec![None; width + other_width]);
            joined[width..].copy_from_slice(row);
        }

        Frame {
            columns: self.joined_columns(other),
            rows,
        }
    }

    /// Rows only for dates present in both frames.
    pub fn inner_join(&self, other: &Frame) -> Frame {
        let rows = self
            .rows
            .iter()
            .filter_map(|(date, row)| {
                other.rows.get(date).map(|other_row| {
                    let mut joined = row.clone();
                    joined.extend_from_slice(other_row);
                    (*date, joined)
                })
            })
            .collect();

        Frame {
            columns: self.joined_columns(other),
            rows,
        }
    }

    /// Keeps only `names`, in that order.
    pub fn select(&self, names: &[String]) -> Result<Frame> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| Error::InvalidName(format!("unknown column `{}`", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|(date, row)| (*date, indices.iter().map(|&i| row[i]).collect()))
            .collect();

        Ok(Frame {
            columns: names.to_vec(),
            rows,
        })
    }

    /// Rows with `start <= date <= end`; open bounds when `None`.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Frame {
        let rows = self
            .rows
            .iter()
            .filter(|(d, _)| start.map_or(true, |s| **d >= s) && end.map_or(true, |e| **d <= e))
            .map(|(d, row)| (*d, row.clone()))
            .collect();
        Frame {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Drops every row with at least one missing cell.
    pub fn drop_incomplete(&self) -> Frame {
        let rows = self
            .rows
            .iter()
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(d, row)| (*d, row.clone()))
            .collect();
        Frame {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Replaces column `index` with `values`, one per row in date order.
    pub fn set_column(&mut self, index: usize, values: Vec<Option<f64>>) {
        for (row, value) in self.rows.values_mut().zip(values) {
            row[index] = value;
        }
    }

    /// Present values of column `index` as `(date, value)` pairs.
    pub fn points(&self, index: usize) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|(d, row)| row[index].map(|v| (*d, v)))
            .collect()
    }

    fn joined_columns(&self, other: &Frame) -> Vec<String> {
        let mut columns = self.columns.clone();
        for name in &other.columns {
            // Same name on both sides: suffix the right-hand column.
            if columns.contains(name) {
                columns.push(format!("{}_right", name));
            } else {
                columns.push(name.clone());
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::date;

    fn series(name: &str, rows: &[(&str, f64)]) -> TimeSeries {
        TimeSeries::from_pairs(name, rows.iter().map(|(d, v)| (date(d), *v)))
    }

    #[test]
    fn outer_join_keeps_every_date() {
        let a = series("a", &[("2020-01-01", 1.0), ("2020-01-02", 2.0)]);
        let b = series("b", &[("2020-01-02", 20.0), ("2020-01-03", 30.0)]);

        let frame = Frame::outer_join_all(&[a, b]);

        assert_eq!(frame.columns, vec!["a", "b"]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.rows[&date("2020-01-01")], vec![Some(1.0), None]);
        assert_eq!(frame.rows[&date("2020-01-02")], vec![Some(2.0), Some(20.0)]);
        assert_eq!(frame.rows[&date("2020-01-03")], vec![None, Some(30.0)]);
    }

    #[test]
    fn inner_join_keeps_shared_dates() {
        let a = Frame::from_series(&series("a", &[("2020-01-01", 1.0), ("2020-01-02", 2.0)]));
        let b = Frame::from_series(&series("b", &[("2020-01-02", 20.0), ("2020-01-03", 30.0)]));

        let frame = a.inner_join(&b);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.rows[&date("2020-01-02")], vec![Some(2.0), Some(20.0)]);
    }

    #[test]
    fn duplicate_column_names_get_a_suffix() {
        let a = Frame::from_series(&series("value", &[("2020-01-01", 1.0)]));
        let frame = a.inner_join(&a);
        assert_eq!(frame.columns, vec!["value", "value_right"]);
    }

    #[test]
    fn select_filter_and_drop_incomplete() {
        let a = series("a", &[("2020-01-01", 1.0), ("2020-01-02", 2.0), ("2020-01-03", 3.0)]);
        let b = series("b", &[("2020-01-02", 20.0), ("2020-01-03", 30.0)]);
        let c = series("c", &[("2020-01-01", 100.0)]);
        let frame = Frame::outer_join_all(&[a, b, c]);

        let picked = frame.select(&["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(picked.columns, vec!["b", "a"]);
        assert_eq!(picked.rows[&date("2020-01-02")], vec![Some(20.0), Some(2.0)]);

        let complete = picked.drop_incomplete();
        assert_eq!(complete.dates().collect::<Vec<_>>(), vec![date("2020-01-02"), date("2020-01-03")]);

        let cut = complete.between(Some(date("2020-01-03")), None);
        assert_eq!(cut.len(), 1);

        assert!(frame.select(&["zzz".to_string()]).is_err());
    }

    #[test]
    fn empty_join_is_empty() {
        let frame = Frame::outer_join_all(&[]);
        assert!(frame.is_empty());
        assert!(frame.columns.is_empty());
    }
}
