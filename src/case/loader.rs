//! Load case configurations and override tables from JSON files

use super::{CaseConfig, OverrideTable};
use crate::error::Result;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Load a case from a JSON file
pub fn load_case<P: AsRef<Path>>(path: P) -> Result<CaseConfig> {
    let file = File::open(path)?;
    load_case_from_reader(BufReader::new(file))
}

/// Load a case from any reader (e.g., string buffer, request body)
pub fn load_case_from_reader<R: Read>(reader: R) -> Result<CaseConfig> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load an override table; a missing file is an empty table
pub fn load_overrides<P: AsRef<Path>>(path: P) -> Result<OverrideTable> {
    let path = path.as_ref();
    if !path.exists() {
        log::debug!("no overrides at {}, starting empty", path.display());
        return Ok(OverrideTable::new());
    }
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Persist an override table as pretty JSON
pub fn save_overrides<W: Write>(overrides: &OverrideTable, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, overrides)?;
    Ok(())
}
