//! Case runner for efficient batch restatements
//!
//! Pre-loads reference tables once, then runs many cases against them
//! without re-reading CSV files.

use crate::case::{CaseConfig, OverrideTable};
use crate::error::Result;
use crate::ledger::{AccrualEngine, LedgerResult};
use crate::tables::ReferenceTables;
use rayon::prelude::*;
use std::path::Path;

/// Pre-loaded case runner
///
/// # Example
/// ```ignore
/// let runner = CaseRunner::from_csv()?;
///
/// for case in &cases {
///     let result = runner.run(case, &OverrideTable::new());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CaseRunner {
    tables: ReferenceTables,
}

impl CaseRunner {
    /// Create runner by loading tables from the default directory
    pub fn from_csv() -> Result<Self> {
        Ok(Self {
            tables: ReferenceTables::from_csv()?,
        })
    }

    /// Create runner from a specific tables directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Ok(Self {
            tables: ReferenceTables::from_csv_path(path)?,
        })
    }

    /// Create runner with pre-built tables
    pub fn with_tables(tables: ReferenceTables) -> Self {
        Self { tables }
    }

    /// Restate a single case
    pub fn run(&self, case: &CaseConfig, overrides: &OverrideTable) -> LedgerResult {
        AccrualEngine::new(&self.tables).restate(case, overrides)
    }

    /// Restate many cases in parallel; results keep the input order
    pub fn run_batch(&self, cases: &[(CaseConfig, OverrideTable)]) -> Vec<LedgerResult> {
        let engine = AccrualEngine::new(&self.tables);
        cases
            .par_iter()
            .map(|(case, overrides)| engine.restate(case, overrides))
            .collect()
    }

    /// Restate one case under several override tables (e.g. alternative manual edits)
    pub fn run_variants(&self, case: &CaseConfig, variants: &[OverrideTable]) -> Vec<LedgerResult> {
        let engine = AccrualEngine::new(&self.tables);
        variants.iter().map(|overrides| engine.restate(case, overrides)).collect()
    }
}
