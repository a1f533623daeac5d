//! Manual per-row overrides
//!
//! Overrides are keyed by 0-based row index and replace engine-computed
//! component values for that row. They are not re-indexed when the case's
//! date range changes, so an override may land on a different month after
//! the range is moved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields a caller may override on a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideField {
    Base,
    Allowance,
    Floor,
    SeniorityPct,
    SeniorityValue,
    OneSixth,
    Retp,
}

/// Values that supersede the computed ones for a single row
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_sixth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retp: Option<f64>,
}

impl RowOverride {
    pub fn get(&self, field: OverrideField) -> Option<f64> {
        match field {
            OverrideField::Base => self.base,
            OverrideField::Allowance => self.allowance,
            OverrideField::Floor => self.floor,
            OverrideField::SeniorityPct => self.seniority_pct,
            OverrideField::SeniorityValue => self.seniority_value,
            OverrideField::OneSixth => self.one_sixth,
            OverrideField::Retp => self.retp,
        }
    }

    pub fn set(&mut self, field: OverrideField, value: f64) {
        let slot = match field {
            OverrideField::Base => &mut self.base,
            OverrideField::Allowance => &mut self.allowance,
            OverrideField::Floor => &mut self.floor,
            OverrideField::SeniorityPct => &mut self.seniority_pct,
            OverrideField::SeniorityValue => &mut self.seniority_value,
            OverrideField::OneSixth => &mut self.one_sixth,
            OverrideField::Retp => &mut self.retp,
        };
        *slot = Some(value);
    }
}

/// How many rows a manual edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    /// Only the edited row
    One,
    /// The edited row and the following rows, `n` rows in total
    Count(usize),
    /// The edited row through the last row of the ledger
    ToEnd,
}

/// Sparse side-table of overrides by 0-based row index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideTable {
    rows: BTreeMap<usize, RowOverride>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize) -> Option<&RowOverride> {
        self.rows.get(&row)
    }

    /// Apply a manual edit starting at `row`. Rows at or beyond `row_count`
    /// are never written.
    pub fn apply_edit(
        &mut self,
        row: usize,
        field: OverrideField,
        value: f64,
        scope: EditScope,
        row_count: usize,
    ) {
        if row >= row_count {
            log::debug!("edit at row {} ignored: ledger has {} rows", row, row_count);
            return;
        }

        let last = match scope {
            EditScope::One => row,
            EditScope::Count(0) => return,
            EditScope::Count(n) => row.saturating_add(n - 1).min(row_count - 1),
            EditScope::ToEnd => row_count - 1,
        };

        for index in row..=last {
            self.rows.entry(index).or_default().set(field, value);
        }
    }

    /// Copy of this table with a manual edit applied
    pub fn with_edit(
        &self,
        row: usize,
        field: OverrideField,
        value: f64,
        scope: EditScope,
        row_count: usize,
    ) -> OverrideTable {
        let mut updated = self.clone();
        updated.apply_edit(row, field, value, scope, row_count);
        updated
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn clear_row(&mut self, row: usize) -> Option<RowOverride> {
        self.rows.remove(&row)
    }

    /// Drop the override with the highest row index. Lower indices are not
    /// renumbered.
    pub fn drop_highest(&mut self) -> Option<(usize, RowOverride)> {
        self.rows.pop_last()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &RowOverride)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
