//! Case configuration: date range, component toggles, rates, and boundary dates

use crate::calendar::{first_of_month, months_between};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which component the special allowance (RETP) mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetpBasis {
    #[default]
    Base,
    Allowance,
    Floor,
}

/// Feature toggles selecting which components enter the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentToggles {
    pub base_pay: bool,
    pub allowance: bool,
    /// Halve the allowance looked up from the schedule
    pub halve_allowance: bool,
    pub floor_pay: bool,
    pub seniority: bool,
    pub one_sixth: bool,
    /// Special allowance (RETP)
    pub retp: bool,
    pub vacation: bool,
    pub vacation_third: bool,
    pub thirteenth: bool,
    pub long_service_leave: bool,
}

impl ComponentToggles {
    /// Only base pay enabled
    pub fn base_only() -> Self {
        Self {
            base_pay: true,
            ..Default::default()
        }
    }

    /// Every component enabled except allowance halving
    pub fn all() -> Self {
        Self {
            base_pay: true,
            allowance: true,
            halve_allowance: false,
            floor_pay: true,
            seniority: true,
            one_sixth: true,
            retp: true,
            vacation: true,
            vacation_third: true,
            thirteenth: true,
            long_service_leave: true,
        }
    }

    /// Whether any of vacation, vacation third, or thirteenth salary accrues
    pub fn any_periodic_benefit(&self) -> bool {
        self.vacation || self.vacation_third || self.thirteenth
    }
}

/// Configuration of one restatement run. Immutable during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseConfig {
    /// First month of the ledger (normalized to day 1)
    pub start: NaiveDate,
    /// Last month of the ledger, inclusive (normalized to day 1)
    pub end: NaiveDate,

    #[serde(default)]
    pub toggles: ComponentToggles,
    #[serde(default)]
    pub retp_basis: RetpBasis,

    #[serde(default)]
    pub base_value: f64,
    #[serde(default)]
    pub floor_value: f64,
    /// Seniority percent at the start of the range
    #[serde(default)]
    pub initial_seniority_pct: f64,

    /// Deduction rate in percent, subtracted from the final subtotal
    #[serde(default)]
    pub deduction_rate: f64,
    /// First addition rate in percent
    #[serde(default)]
    pub addition_rate_1: f64,
    /// Second addition rate in percent
    #[serde(default)]
    pub addition_rate_2: f64,

    /// Month whose correction index restates every row; also the end of the
    /// treasury-rate accrual interval
    #[serde(default)]
    pub correction_limit: Option<NaiveDate>,
    /// Savings-interest accrual runs from each row up to this date
    #[serde(default)]
    pub savings_limit: Option<NaiveDate>,
    /// Treasury-rate accrual never starts before this date
    #[serde(default)]
    pub treasury_start: Option<NaiveDate>,
}

impl CaseConfig {
    /// Create a case over `[start, end]` with every component off and all rates zero
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            toggles: ComponentToggles::default(),
            retp_basis: RetpBasis::default(),
            base_value: 0.0,
            floor_value: 0.0,
            initial_seniority_pct: 0.0,
            deduction_rate: 0.0,
            addition_rate_1: 0.0,
            addition_rate_2: 0.0,
            correction_limit: None,
            savings_limit: None,
            treasury_start: None,
        }
    }

    /// Start month, day 1
    pub fn first_month(&self) -> NaiveDate {
        first_of_month(self.start)
    }

    /// End month, day 1
    pub fn last_month(&self) -> NaiveDate {
        first_of_month(self.end)
    }

    /// Number of ledger rows this case produces (0 when start is after end)
    pub fn row_count(&self) -> usize {
        let months = months_between(self.first_month(), self.last_month());
        if months < 0 {
            0
        } else {
            months as usize + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_row_count() {
        assert_eq!(CaseConfig::new(date(2020, 1, 1), date(2020, 3, 1)).row_count(), 3);
        assert_eq!(CaseConfig::new(date(2020, 1, 20), date(2020, 1, 5)).row_count(), 1);
        assert_eq!(CaseConfig::new(date(2019, 1, 1), date(2023, 12, 1)).row_count(), 60);
        assert_eq!(CaseConfig::new(date(2020, 3, 1), date(2020, 1, 1)).row_count(), 0);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "start": "2020-01-15",
            "end": "2020-06-01",
            "base_value": 1000.0,
            "toggles": { "base_pay": true, "vacation": true },
            "retp_basis": "floor",
            "correction_limit": "2024-05-01"
        }"#;

        let case: CaseConfig = serde_json::from_str(json).unwrap();
        assert_eq!(case.first_month(), date(2020, 1, 1));
        assert!(case.toggles.base_pay);
        assert!(case.toggles.vacation);
        assert!(!case.toggles.allowance);
        assert!(case.toggles.any_periodic_benefit());
        assert_eq!(case.retp_basis, RetpBasis::Floor);
        assert_eq!(case.deduction_rate, 0.0);
        assert_eq!(case.correction_limit, Some(date(2024, 5, 1)));
        assert_eq!(case.savings_limit, None);
    }
}
