//! Incremental merge of a freshly fetched batch into a stored snapshot.

use chrono::NaiveDate;

use crate::timeseries::TimeSeries;

/// Combines `existing` with `batch`. Every date from either side appears once,
/// the batch wins on overlapping dates, and the result is ascending by date.
/// The result carries the batch's name.
pub fn merge(existing: Option<&TimeSeries>, batch: &TimeSeries) -> TimeSeries {
    let mut merged = match existing {
        Some(existing) => existing.entries.clone(),
        None => Default::default(),
    };
    merged.extend(batch.iter());

    TimeSeries {
        name: batch.name.clone(),
        entries: merged,
    }
}

/// First date not yet covered by a snapshot whose last row is `latest`.
pub fn next_cursor(latest: Option<NaiveDate>) -> Option<NaiveDate> {
    latest.and_then(|d| d.succ_opt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::date;

    fn series(rows: &[(&str, f64)]) -> TimeSeries {
        TimeSeries::from_pairs("x", rows.iter().map(|(d, v)| (date(d), *v)))
    }

    #[test]
    fn overlapping_dates_take_the_new_value() {
        let existing = series(&[("2020-01-01", 1.0), ("2020-01-02", 2.0)]);
        let batch = series(&[("2020-01-02", 2.5), ("2020-01-03", 3.0)]);

        let merged = merge(Some(&existing), &batch);

        assert_eq!(
            merged.iter().collect::<Vec<_>>(),
            vec![
                (date("2020-01-01"), 1.0),
                (date("2020-01-02"), 2.5),
                (date("2020-01-03"), 3.0),
            ]
        );
    }

    #[test]
    fn missing_snapshot_means_batch_only() {
        let batch = series(&[("2020-01-02", 2.5)]);
        assert_eq!(merge(None, &batch), batch);
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = series(&[("2019-12-31", 0.5), ("2020-01-01", 1.0)]);
        let batch = series(&[("2020-01-01", 1.1), ("2020-01-02", 2.0)]);

        let once = merge(Some(&existing), &batch);
        let twice = merge(Some(&once), &batch);
        assert_eq!(once, twice);

        let self_merge = merge(Some(&batch), &batch);
        assert_eq!(self_merge, batch);
    }

    #[test]
    fn output_is_ascending_without_duplicates() {
        let existing = series(&[("2020-03-01", 3.0), ("2020-01-01", 1.0)]);
        let batch = series(&[("2020-02-01", 2.0), ("2020-01-01", 1.5), ("2019-12-01", 0.0)]);

        let merged = merge(Some(&existing), &batch);
        let dates: Vec<_> = merged.iter().map(|(d, _)| d).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(dates.len(), 4);
    }

    #[test]
    fn cursor_is_the_day_after_latest() {
        assert_eq!(next_cursor(Some(date("2020-02-28"))), Some(date("2020-02-29")));
        assert_eq!(next_cursor(Some(date("2020-12-31"))), Some(date("2021-01-01")));
        assert_eq!(next_cursor(None), None);
    }
}
