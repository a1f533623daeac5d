//! Reference table maintenance: diff, merge, non-regression checks, and
//! series rebuilding
//!
//! Publishing a new edition of a table must never lose periods the previous
//! edition had. These helpers compare editions before one replaces the other,
//! and derive monthly series from the shapes the rates are published in.

use super::{CorrectionIndexTable, FactorSeries};
use crate::calendar::MonthKey;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Values closer than this are considered unchanged
pub const VALUE_TOLERANCE: f64 = 1e-12;

/// Differences between two editions of a correction index table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    /// Months only present in the updated table
    pub added: Vec<(MonthKey, f64)>,
    /// Months present in both with different values: (month, before, after)
    pub changed: Vec<(MonthKey, f64, f64)>,
    /// Months only present in the original table
    pub removed: Vec<MonthKey>,
    pub original_len: usize,
    pub updated_len: usize,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Compare two editions of a correction index table
pub fn diff_correction_tables(
    original: &CorrectionIndexTable,
    updated: &CorrectionIndexTable,
) -> TableDiff {
    let mut diff = TableDiff {
        original_len: original.len(),
        updated_len: updated.len(),
        ..Default::default()
    };

    for (month, after) in updated.iter() {
        match original.get_exact(month) {
            None => diff.added.push((*month, *after)),
            Some(before) if (before - after).abs() > VALUE_TOLERANCE => {
                diff.changed.push((*month, before, *after))
            }
            Some(_) => {}
        }
    }

    for (month, _) in original.iter() {
        if !updated.contains(month) {
            diff.removed.push(*month);
        }
    }

    diff
}

/// Add the months of `incoming` that `existing` lacks. Existing values are
/// never overwritten. Returns the merged table and the months added.
pub fn merge_new_entries(
    existing: &CorrectionIndexTable,
    incoming: &CorrectionIndexTable,
) -> (CorrectionIndexTable, Vec<MonthKey>) {
    let mut merged = existing.clone();
    let mut added = Vec::new();

    for (month, index) in incoming.iter() {
        if !merged.contains(month) {
            merged.insert(*month, *index);
            added.push(*month);
        }
    }

    (merged, added)
}

/// How periods are matched when checking factor series for regressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegressionMode {
    /// Compare by `YYYY-MM`; tolerant of mid-month dates in older editions
    #[default]
    Month,
    /// Compare full dates
    Strict,
}

/// Periods an older series had that a newer one lost or changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegressionReport {
    pub lost: Vec<String>,
    pub changed: Vec<String>,
}

impl RegressionReport {
    pub fn passed(&self) -> bool {
        self.lost.is_empty() && self.changed.is_empty()
    }
}

/// Period labels mapped to the last value seen for each period
fn period_values(series: &FactorSeries, mode: RegressionMode) -> BTreeMap<String, f64> {
    let label = |date: &NaiveDate| match mode {
        RegressionMode::Month => MonthKey::from_date(*date).to_string(),
        RegressionMode::Strict => date.format("%Y-%m-%d").to_string(),
    };

    series
        .entries()
        .iter()
        .map(|(date, factor)| (label(date), *factor))
        .collect()
}

/// Check that `new` keeps every period of `old`. With `check_values`, a
/// period whose value moved by more than the tolerance also fails.
pub fn check_regression(
    old: &FactorSeries,
    new: &FactorSeries,
    mode: RegressionMode,
    check_values: bool,
) -> RegressionReport {
    let old_values = period_values(old, mode);
    let new_values = period_values(new, mode);

    let old_keys: BTreeSet<&String> = old_values.keys().collect();
    let new_keys: BTreeSet<&String> = new_values.keys().collect();

    let lost: Vec<String> = old_keys.difference(&new_keys).map(|k| (*k).clone()).collect();

    let changed = if check_values {
        old_values
            .iter()
            .filter_map(|(period, before)| {
                new_values
                    .get(period)
                    .filter(|after| (*before - **after).abs() > VALUE_TOLERANCE)
                    .map(|_| period.clone())
            })
            .collect()
    } else {
        Vec::new()
    };

    if !lost.is_empty() {
        log::warn!("regression check: {} periods lost", lost.len());
    }

    RegressionReport { lost, changed }
}

/// Check that `new` keeps every month of `old`. With `check_values`, a
/// month whose index changed also fails.
pub fn check_correction_regression(
    old: &CorrectionIndexTable,
    new: &CorrectionIndexTable,
    check_values: bool,
) -> RegressionReport {
    let diff = diff_correction_tables(old, new);
    let changed = if check_values {
        diff.changed.iter().map(|(month, _, _)| month.to_string()).collect()
    } else {
        Vec::new()
    };

    RegressionReport {
        lost: diff.removed.iter().map(MonthKey::to_string).collect(),
        changed,
    }
}

/// Business days in a year for annualized daily rates
pub const BUSINESS_DAYS_PER_YEAR: f64 = 252.0;

fn series_from_months(months: BTreeMap<MonthKey, f64>) -> FactorSeries {
    FactorSeries::from_entries(
        months
            .into_iter()
            .filter_map(|(month, factor)| month.first_day().map(|day| (day, factor))),
    )
}

/// Join two editions of a series at `cutoff`: months before it come from
/// `old`, the cutoff month onward from `new`. Every entry is moved to the
/// first day of its month, one entry per month (the first one seen, as in
/// lookups).
pub fn splice_series(old: &FactorSeries, new: &FactorSeries, cutoff: MonthKey) -> FactorSeries {
    let mut months = BTreeMap::new();

    for (date, factor) in old.entries() {
        let month = MonthKey::from_date(*date);
        if month < cutoff {
            months.entry(month).or_insert(*factor);
        }
    }
    for (date, factor) in new.entries() {
        let month = MonthKey::from_date(*date);
        if month >= cutoff {
            months.entry(month).or_insert(*factor);
        }
    }

    series_from_months(months)
}

/// Monthly factors from daily quotes of an annual rate in percent on a
/// 252 business day basis. Each quote becomes the daily factor
/// `(1 + r)^(1/252) - 1`; a month's daily factors compound as
/// `prod(1 + fd) - 1`. Entries are dated on the first of each month.
pub fn monthly_from_daily_annual_252(daily: &[(NaiveDate, f64)]) -> FactorSeries {
    let mut growth: BTreeMap<MonthKey, f64> = BTreeMap::new();

    for (date, annual_pct) in daily {
        let daily_factor = (1.0 + annual_pct / 100.0).powf(1.0 / BUSINESS_DAYS_PER_YEAR) - 1.0;
        *growth.entry(MonthKey::from_date(*date)).or_insert(1.0) *= 1.0 + daily_factor;
    }

    series_from_months(growth.into_iter().map(|(month, g)| (month, g - 1.0)).collect())
}
