//! Reference tables: correction index, allowance schedule, and interest factor series

mod correction;
mod allowance;
mod factors;
pub mod compare;
pub mod loader;
pub mod store;

pub use correction::{CorrectionIndexTable, MAX_FALLBACK_MONTHS};
pub use allowance::AllowanceSchedule;
pub use factors::{FactorSeries, sum_factors_over_range};
pub use loader::LoadedTables;

use crate::error::Result;
use std::path::Path;

/// Container for all reference data a restatement reads.
/// Loaded once and read-only during runs.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub correction: CorrectionIndexTable,
    pub allowance: AllowanceSchedule,
    pub savings: FactorSeries,
    pub treasury: FactorSeries,
}

impl ReferenceTables {
    pub fn new(
        correction: CorrectionIndexTable,
        allowance: AllowanceSchedule,
        savings: FactorSeries,
        treasury: FactorSeries,
    ) -> Self {
        Self { correction, allowance, savings, treasury }
    }

    /// Load tables from the default location (data/tables/)
    pub fn from_csv() -> Result<Self> {
        Self::from_csv_path(Path::new(loader::DEFAULT_TABLES_PATH))
    }

    /// Load tables from a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let loaded = LoadedTables::load_from(path)?;
        Ok(Self::from_loaded(loaded))
    }

    pub fn from_loaded(loaded: LoadedTables) -> Self {
        Self {
            correction: loaded.correction,
            allowance: loaded.allowance,
            savings: loaded.savings,
            treasury: loaded.treasury,
        }
    }
}
