//! Column descriptors mapping ledger fields to presentation order
//!
//! The engine never looks fields up by name. Renderers walk `LEDGER_COLUMNS`
//! and call each descriptor's accessor instead.

use super::rows::{LedgerRow, LedgerTotals};

/// How a column's values should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Sequence,
    Month,
    Money,
    Percent,
    Factor,
}

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(u32),
    Text(String),
    Number(f64),
}

/// Key, label, kind, and accessors for one ledger column
#[derive(Clone, Copy)]
pub struct ColumnDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub cell: fn(&LedgerRow) -> CellValue,
    /// None for columns without a total (sequence, month)
    pub total: Option<fn(&LedgerTotals) -> f64>,
}

macro_rules! numeric_column {
    ($key:literal, $label:literal, $kind:expr, $field:ident) => {
        ColumnDescriptor {
            key: $key,
            label: $label,
            kind: $kind,
            cell: |row: &LedgerRow| CellValue::Number(row.$field),
            total: Some(|totals: &LedgerTotals| totals.$field),
        }
    };
}

/// All ledger columns in display order
pub const LEDGER_COLUMNS: &[ColumnDescriptor] = &[
    ColumnDescriptor {
        key: "sequence",
        label: "#",
        kind: ColumnKind::Sequence,
        cell: |row: &LedgerRow| CellValue::Integer(row.sequence),
        total: None,
    },
    ColumnDescriptor {
        key: "month",
        label: "Month",
        kind: ColumnKind::Month,
        cell: |row: &LedgerRow| CellValue::Text(row.month.to_string()),
        total: None,
    },
    numeric_column!("base", "Base", ColumnKind::Money, base),
    numeric_column!("allowance", "Allowance", ColumnKind::Money, allowance),
    numeric_column!("floor", "Floor", ColumnKind::Money, floor),
    numeric_column!("seniority_pct", "Seniority %", ColumnKind::Percent, seniority_pct),
    numeric_column!("seniority_value", "Seniority", ColumnKind::Money, seniority_value),
    numeric_column!("one_sixth", "One-sixth", ColumnKind::Money, one_sixth),
    numeric_column!("retp", "RETP", ColumnKind::Money, retp),
    numeric_column!("sub_base", "Sub-base", ColumnKind::Money, sub_base),
    numeric_column!("correction_index", "Index", ColumnKind::Factor, correction_index),
    numeric_column!("corrected_value", "Corrected", ColumnKind::Money, corrected_value),
    numeric_column!("vacation", "Vacation", ColumnKind::Money, vacation),
    numeric_column!("vacation_third", "Vacation 1/3", ColumnKind::Money, vacation_third),
    numeric_column!("thirteenth", "13th", ColumnKind::Money, thirteenth),
    numeric_column!("long_service_leave", "Leave", ColumnKind::Money, long_service_leave),
    numeric_column!("subtotal", "Subtotal", ColumnKind::Money, subtotal),
    numeric_column!("savings_factor", "Savings factor", ColumnKind::Factor, savings_factor),
    numeric_column!("savings_interest", "Savings interest", ColumnKind::Money, savings_interest),
    numeric_column!(
        "subtotal_after_savings",
        "After savings",
        ColumnKind::Money,
        subtotal_after_savings
    ),
    numeric_column!("treasury_factor", "Treasury factor", ColumnKind::Factor, treasury_factor),
    numeric_column!("treasury_interest", "Treasury interest", ColumnKind::Money, treasury_interest),
    numeric_column!(
        "subtotal_after_treasury",
        "After treasury",
        ColumnKind::Money,
        subtotal_after_treasury
    ),
    numeric_column!("deduction", "Deduction", ColumnKind::Money, deduction),
    numeric_column!("addition_1", "Addition 1", ColumnKind::Money, addition_1),
    numeric_column!("addition_2", "Addition 2", ColumnKind::Money, addition_2),
    numeric_column!("total", "Total", ColumnKind::Money, total),
];

/// Look up a column by key
pub fn column(key: &str) -> Option<&'static ColumnDescriptor> {
    LEDGER_COLUMNS.iter().find(|c| c.key == key)
}
