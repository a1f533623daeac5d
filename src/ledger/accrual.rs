//! Interest accrual regimes
//!
//! Both the savings regime and the treasury-rate regime sum monthly factors
//! over an interval and apply the sum once to the running subtotal. They
//! differ only in how the interval is chosen for a given row.

use crate::tables::FactorSeries;
use chrono::NaiveDate;

/// How the accrual interval is derived from a row's month
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccrualInterval {
    /// From the row's month up to `end`
    UntilBoundary { end: Option<NaiveDate> },
    /// From the later of the row's month and `floor`, up to `end`
    FlooredStart {
        floor: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl AccrualInterval {
    /// Interval for a row, or None when the row accrues nothing
    pub fn for_row(&self, row_date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let (start, end) = match *self {
            AccrualInterval::UntilBoundary { end } => (row_date, end?),
            AccrualInterval::FlooredStart { floor, end } => {
                let start = floor.map_or(row_date, |f| row_date.max(f));
                (start, end?)
            }
        };

        if start <= end {
            Some((start, end))
        } else {
            None
        }
    }
}

/// Result of accruing interest on one row
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accrual {
    /// Sum of monthly factors over the interval
    pub factor: f64,
    /// amount × factor
    pub interest: f64,
    /// amount + interest
    pub total: f64,
}

/// An interval policy paired with the factor series it sums
#[derive(Debug, Clone, Copy)]
pub struct InterestRegime<'a> {
    interval: AccrualInterval,
    series: &'a FactorSeries,
}

impl<'a> InterestRegime<'a> {
    pub fn new(interval: AccrualInterval, series: &'a FactorSeries) -> Self {
        Self { interval, series }
    }

    /// Accumulated factor for a row (0 outside the interval)
    pub fn accumulated_factor(&self, row_date: NaiveDate) -> f64 {
        match self.interval.for_row(row_date) {
            Some((start, end)) => self.series.sum_over_range(Some(start), Some(end)),
            None => 0.0,
        }
    }

    /// Apply the accumulated factor to `amount`
    pub fn accrue(&self, row_date: NaiveDate, amount: f64) -> Accrual {
        let factor = self.accumulated_factor(row_date);
        let interest = amount * factor;
        Accrual {
            factor,
            interest,
            total: amount + interest,
        }
    }
}
