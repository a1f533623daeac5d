//! Restatement ledger: accrual engine, carried state, and output rows

mod state;
mod engine;
mod accrual;
mod rows;
pub mod columns;

pub use state::{AccrualState, LeaveAccrual};
pub use engine::{AccrualEngine, SENIORITY_STEP_MONTHS, SENIORITY_STEP_PCT};
pub use accrual::{Accrual, AccrualInterval, InterestRegime};
pub use rows::{LedgerResult, LedgerRow, LedgerSummary, LedgerTotals};
pub use columns::{CellValue, ColumnDescriptor, ColumnKind, LEDGER_COLUMNS};
