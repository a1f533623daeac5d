//! Monetary correction index by month
//!
//! The coefficient published for a month restates an amount from that month
//! to present value: `amount / index(month) * index(limit)`.

use crate::calendar::MonthKey;
use std::collections::BTreeMap;

/// How far back a missing month may be resolved from earlier publications
pub const MAX_FALLBACK_MONTHS: u32 = 24;

/// Correction coefficients keyed by month
#[derive(Debug, Clone, Default)]
pub struct CorrectionIndexTable {
    indices: BTreeMap<MonthKey, f64>,
}

impl CorrectionIndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from (month, coefficient) pairs; later duplicates replace earlier ones
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (MonthKey, f64)>,
    {
        Self {
            indices: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, month: MonthKey, index: f64) {
        self.indices.insert(month, index);
    }

    /// Exact lookup without fallback
    pub fn get_exact(&self, month: &MonthKey) -> Option<f64> {
        self.indices.get(month).copied()
    }

    /// Coefficient for a month, falling back to the most recent month no
    /// more than 24 months earlier. Neutral 1.0 when nothing is found.
    pub fn index_for(&self, month: MonthKey) -> f64 {
        if let Some(index) = self.get_exact(&month) {
            return index;
        }

        let mut candidate = month;
        for _ in 0..MAX_FALLBACK_MONTHS {
            candidate = candidate.previous();
            if let Some(index) = self.get_exact(&candidate) {
                log::debug!("correction index for {} resolved from {}", month, candidate);
                return index;
            }
        }

        log::debug!("no correction index within {} months of {}", MAX_FALLBACK_MONTHS, month);
        1.0
    }

    /// Coefficient for an optional month; a missing month resolves to 1.0
    pub fn index_for_opt(&self, month: Option<MonthKey>) -> f64 {
        month.map(|m| self.index_for(m)).unwrap_or(1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MonthKey, &f64)> {
        self.indices.iter()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, month: &MonthKey) -> bool {
        self.indices.contains_key(month)
    }

    pub fn first_month(&self) -> Option<MonthKey> {
        self.indices.keys().next().copied()
    }

    pub fn last_month(&self) -> Option<MonthKey> {
        self.indices.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_match() {
        let table =
            CorrectionIndexTable::from_entries([(key("2020-01"), 50.5), (key("2020-02"), 51.0)]);
        assert_eq!(table.index_for(key("2020-02")), 51.0);
    }

    #[test]
    fn test_fallback_uses_nearest_prior_month() {
        // Entries only at M and M+3: M+1 and M+2 resolve to M, not M+3
        let table =
            CorrectionIndexTable::from_entries([(key("2020-01"), 10.0), (key("2020-04"), 20.0)]);

        assert_eq!(table.index_for(key("2020-02")), 10.0);
        assert_eq!(table.index_for(key("2020-03")), 10.0);
        assert_eq!(table.index_for(key("2020-04")), 20.0);
        assert_eq!(table.index_for(key("2020-09")), 20.0);
    }

    #[test]
    fn test_fallback_window_is_24_months() {
        let table = CorrectionIndexTable::from_entries([(key("2018-01"), 7.5)]);

        assert_eq!(table.index_for(key("2020-01")), 7.5); // exactly 24 months later
        assert_eq!(table.index_for(key("2020-02")), 1.0); // 25 months later
        assert_eq!(table.index_for(key("2017-12")), 1.0); // before the table starts
    }

    #[test]
    fn test_missing_month_is_neutral() {
        let table = CorrectionIndexTable::from_entries([(key("2020-01"), 3.0)]);
        assert_eq!(table.index_for_opt(None), 1.0);
        assert_eq!(table.index_for_opt(Some(key("2020-01"))), 3.0);
    }
}
