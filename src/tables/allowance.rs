//! Allowance amounts by effective date

use chrono::NaiveDate;

/// Allowance schedule: each entry applies from its effective date until the
/// next entry takes over
#[derive(Debug, Clone, Default)]
pub struct AllowanceSchedule {
    /// (effective date, amount), ascending by date
    entries: Vec<(NaiveDate, f64)>,
}

impl AllowanceSchedule {
    /// Create from (effective date, amount) pairs in any order
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut entries: Vec<(NaiveDate, f64)> = entries.into_iter().collect();
        // Stable sort keeps file order for entries sharing a date
        entries.sort_by_key(|(date, _)| *date);
        Self { entries }
    }

    /// Amount in effect on `date`: the last entry whose effective date is on
    /// or before `date`, or 0 before the first entry
    pub fn value_on(&self, date: NaiveDate) -> f64 {
        let mut value = 0.0;
        for (effective, amount) in &self.entries {
            if *effective <= date {
                value = *amount;
            }
        }
        value
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
