//! Monthly interest factor series and linear accrual over month ranges
//!
//! Savings and treasury-rate series are published at daily granularity but
//! consumed per month. Accrual is additive: the factors of every month in a
//! range are summed and applied once, never compounded.

use crate::calendar::{add_one_month, first_of_month, MonthKey};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Interest factors by date, resolved per month
#[derive(Debug, Clone, Default)]
pub struct FactorSeries {
    /// Raw (date, factor) entries in source order
    entries: Vec<(NaiveDate, f64)>,
    /// First factor seen for each month
    by_month: BTreeMap<MonthKey, f64>,
}

impl FactorSeries {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let entries: Vec<(NaiveDate, f64)> = entries.into_iter().collect();
        let mut by_month = BTreeMap::new();
        for (date, factor) in &entries {
            by_month.entry(MonthKey::from_date(*date)).or_insert(*factor);
        }
        Self { entries, by_month }
    }

    /// Factor for a month; 0 when the series has no entry dated in that month
    pub fn factor_for(&self, month: MonthKey) -> f64 {
        self.by_month.get(&month).copied().unwrap_or(0.0)
    }

    /// Sum of this series' monthly factors from `start` to `end` inclusive
    pub fn sum_over_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> f64 {
        sum_factors_over_range(start, end, |month| self.factor_for(month))
    }

    pub fn entries(&self) -> &[(NaiveDate, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sum `resolver(month)` for every month from the month of `start` through
/// the month of `end`, inclusive.
///
/// Returns 0 when either bound is missing or `start` is after `end`.
pub fn sum_factors_over_range<F>(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    resolver: F,
) -> f64
where
    F: Fn(MonthKey) -> f64,
{
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s <= e => (s, e),
        _ => return 0.0,
    };

    let last = first_of_month(end);
    let mut cursor = first_of_month(start);
    let mut total = 0.0;

    while cursor <= last {
        total += resolver(MonthKey::from_date(cursor));
        let next = add_one_month(cursor);
        if next == cursor {
            break;
        }
        cursor = next;
    }

    total
}
