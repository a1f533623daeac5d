//! Ledger output structures: one row per month plus column totals

use crate::calendar::MonthKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single month of the restatement ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    // Timing
    /// 1-based sequence number
    pub sequence: u32,
    pub month: MonthKey,
    pub date: NaiveDate,

    // Components (after overrides)
    pub base: f64,
    pub allowance: f64,
    pub floor: f64,
    pub seniority_pct: f64,
    pub seniority_value: f64,
    pub one_sixth: f64,
    pub retp: f64,
    pub sub_base: f64,

    // Monetary correction
    pub correction_index: f64,
    pub corrected_value: f64,

    // Periodic benefits
    pub vacation: f64,
    pub vacation_third: f64,
    pub thirteenth: f64,
    pub long_service_leave: f64,
    pub subtotal: f64,

    // Savings regime
    pub savings_factor: f64,
    pub savings_interest: f64,
    pub subtotal_after_savings: f64,

    // Treasury-rate regime
    pub treasury_factor: f64,
    pub treasury_interest: f64,
    pub subtotal_after_treasury: f64,

    // Deductions and additions
    pub deduction: f64,
    pub addition_1: f64,
    pub addition_2: f64,
    pub total: f64,
}

impl LedgerRow {
    /// Create a row with every value zeroed
    pub fn new(sequence: u32, date: NaiveDate) -> Self {
        Self {
            sequence,
            month: MonthKey::from_date(date),
            date,
            base: 0.0,
            allowance: 0.0,
            floor: 0.0,
            seniority_pct: 0.0,
            seniority_value: 0.0,
            one_sixth: 0.0,
            retp: 0.0,
            sub_base: 0.0,
            correction_index: 0.0,
            corrected_value: 0.0,
            vacation: 0.0,
            vacation_third: 0.0,
            thirteenth: 0.0,
            long_service_leave: 0.0,
            subtotal: 0.0,
            savings_factor: 0.0,
            savings_interest: 0.0,
            subtotal_after_savings: 0.0,
            treasury_factor: 0.0,
            treasury_interest: 0.0,
            subtotal_after_treasury: 0.0,
            deduction: 0.0,
            addition_1: 0.0,
            addition_2: 0.0,
            total: 0.0,
        }
    }
}

/// Field-wise sums of every numeric ledger column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub base: f64,
    pub allowance: f64,
    pub floor: f64,
    pub seniority_pct: f64,
    pub seniority_value: f64,
    pub one_sixth: f64,
    pub retp: f64,
    pub sub_base: f64,
    pub correction_index: f64,
    pub corrected_value: f64,
    pub vacation: f64,
    pub vacation_third: f64,
    pub thirteenth: f64,
    pub long_service_leave: f64,
    pub subtotal: f64,
    pub savings_factor: f64,
    pub savings_interest: f64,
    pub subtotal_after_savings: f64,
    pub treasury_factor: f64,
    pub treasury_interest: f64,
    pub subtotal_after_treasury: f64,
    pub deduction: f64,
    pub addition_1: f64,
    pub addition_2: f64,
    pub total: f64,
}

impl LedgerTotals {
    /// Add one row to the running sums
    pub fn accumulate(&mut self, row: &LedgerRow) {
        self.base += row.base;
        self.allowance += row.allowance;
        self.floor += row.floor;
        self.seniority_pct += row.seniority_pct;
        self.seniority_value += row.seniority_value;
        self.one_sixth += row.one_sixth;
        self.retp += row.retp;
        self.sub_base += row.sub_base;
        self.correction_index += row.correction_index;
        self.corrected_value += row.corrected_value;
        self.vacation += row.vacation;
        self.vacation_third += row.vacation_third;
        self.thirteenth += row.thirteenth;
        self.long_service_leave += row.long_service_leave;
        self.subtotal += row.subtotal;
        self.savings_factor += row.savings_factor;
        self.savings_interest += row.savings_interest;
        self.subtotal_after_savings += row.subtotal_after_savings;
        self.treasury_factor += row.treasury_factor;
        self.treasury_interest += row.treasury_interest;
        self.subtotal_after_treasury += row.subtotal_after_treasury;
        self.deduction += row.deduction;
        self.addition_1 += row.addition_1;
        self.addition_2 += row.addition_2;
        self.total += row.total;
    }
}

/// Complete restatement result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerResult {
    /// Monthly rows in chronological order
    pub rows: Vec<LedgerRow>,

    /// Column totals over `rows`
    pub totals: LedgerTotals,
}

impl LedgerResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and fold it into the totals
    pub fn add_row(&mut self, row: LedgerRow) {
        self.totals.accumulate(&row);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get summary statistics
    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            total_months: self.rows.len() as u32,
            first_month: self.rows.first().map(|r| r.month),
            last_month: self.rows.last().map(|r| r.month),
            total_corrected: self.totals.corrected_value,
            total_benefits: self.totals.vacation
                + self.totals.vacation_third
                + self.totals.thirteenth
                + self.totals.long_service_leave,
            total_interest: self.totals.savings_interest + self.totals.treasury_interest,
            total_adjustments: self.totals.deduction
                + self.totals.addition_1
                + self.totals.addition_2,
            grand_total: self.totals.total,
        }
    }
}

/// Summary statistics for a restatement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_months: u32,
    pub first_month: Option<MonthKey>,
    pub last_month: Option<MonthKey>,
    pub total_corrected: f64,
    pub total_benefits: f64,
    pub total_interest: f64,
    pub total_adjustments: f64,
    pub grand_total: f64,
}
