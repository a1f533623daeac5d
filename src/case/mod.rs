//! Case configuration, manual overrides, and JSON loading

mod data;
mod overrides;
pub mod loader;

pub use data::{CaseConfig, ComponentToggles, RetpBasis};
pub use overrides::{EditScope, OverrideField, OverrideTable, RowOverride};
pub use loader::{load_case, load_case_from_reader, load_overrides, save_overrides};
