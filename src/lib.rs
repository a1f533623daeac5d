//! Salary Restatement - month-by-month restatement of salary-like obligations
//!
//! This library provides:
//! - Reference tables (correction index, allowance schedule, interest factor series)
//! - Lookup resolvers with neutral fallbacks
//! - The accrual engine producing one ledger row per month plus totals
//! - Manual per-row overrides with scoped edits
//! - Batch runs over many cases sharing one set of tables

pub mod calendar;
pub mod error;
pub mod tables;
pub mod case;
pub mod ledger;
pub mod scenario;

// Re-export commonly used types
pub use calendar::MonthKey;
pub use error::{RestatementError, Result};
pub use tables::{ReferenceTables, CorrectionIndexTable, AllowanceSchedule, FactorSeries};
pub use case::{CaseConfig, ComponentToggles, RetpBasis, OverrideTable, OverrideField, EditScope};
pub use ledger::{AccrualEngine, LedgerResult, LedgerRow, LedgerTotals};
pub use scenario::CaseRunner;
