//! CSV/JSON/script reference table loader
//!
//! Loads the four reference tables from files in data/tables/:
//! - correction_index.csv  `month,index`          (month = YYYY-MM)
//! - allowance.csv         `effective_date,value` (date = YYYY-MM-DD)
//! - savings_factors.csv   `date,factor`
//! - treasury_factors.csv  `date,factor`
//!
//! The correction index may also be given as a JSON map `{"YYYY-MM": index}`.
//! Both the correction index and the factor series can be read from and
//! written back to the JavaScript literal files the calculator front end
//! ships: `const name = { '2020-01': 1.5, };` for the index and
//! `const name = [ { date: '2020-01-01', factor: 0.005 }, ];` for a series.

use super::{AllowanceSchedule, CorrectionIndexTable, FactorSeries};
use crate::calendar::{parse_date, MonthKey};
use crate::error::{RestatementError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Default path to the reference tables directory
pub const DEFAULT_TABLES_PATH: &str = "data/tables";

pub const CORRECTION_INDEX_FILE: &str = "correction_index.csv";
pub const ALLOWANCE_FILE: &str = "allowance.csv";
pub const SAVINGS_FACTORS_FILE: &str = "savings_factors.csv";
pub const TREASURY_FACTORS_FILE: &str = "treasury_factors.csv";

/// Declared name used when writing a script file that had none
pub const DEFAULT_SCRIPT_NAME: &str = "referenceTable";

/// On-disk encoding of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
    /// JavaScript `const name = ...;` literal
    Script,
}

impl TableFormat {
    /// Pick the format from the file extension; anything unrecognized is CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => TableFormat::Json,
            "js" => TableFormat::Script,
            _ => TableFormat::Csv,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CorrectionCsvRow {
    month: String,
    index: String,
}

#[derive(Debug, Deserialize)]
struct AllowanceCsvRow {
    effective_date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FactorCsvRow {
    date: String,
    factor: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FactorEntry {
    date: String,
    factor: f64,
}

fn parse_month_field(table: &str, row: usize, raw: &str) -> Result<MonthKey> {
    raw.parse().map_err(|_| RestatementError::InvalidMonthKey {
        table: table.to_string(),
        row,
        value: raw.to_string(),
    })
}

fn parse_date_field(table: &str, row: usize, raw: &str) -> Result<NaiveDate> {
    parse_date(raw).ok_or_else(|| RestatementError::InvalidDate {
        table: table.to_string(),
        row,
        value: raw.to_string(),
    })
}

/// Numbers use '.' as decimal separator, or the published form with '.'
/// grouping thousands and ',' as decimal separator (`1.234,5678`)
fn parse_number_field(table: &str, row: usize, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse().map_err(|_| RestatementError::InvalidNumber {
        table: table.to_string(),
        row,
        value: raw.to_string(),
    })
}

fn correction_from_map(raw: BTreeMap<String, f64>, table: &str) -> Result<CorrectionIndexTable> {
    let mut correction = CorrectionIndexTable::new();
    for (i, (month, index)) in raw.into_iter().enumerate() {
        let month = parse_month_field(table, i + 1, &month)?;
        correction.insert(month, index);
    }
    Ok(correction)
}

/// Load a correction index table from any CSV reader
pub fn read_correction_index<R: Read>(reader: R) -> Result<CorrectionIndexTable> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut table = CorrectionIndexTable::new();

    for (i, result) in csv_reader.deserialize().enumerate() {
        let record: CorrectionCsvRow = result?;
        let row = i + 1;
        let month = parse_month_field(CORRECTION_INDEX_FILE, row, &record.month)?;
        let index = parse_number_field(CORRECTION_INDEX_FILE, row, &record.index)?;
        table.insert(month, index);
    }

    Ok(table)
}

/// Load a correction index table from a JSON map of month key to index
pub fn read_correction_index_json<R: Read>(reader: R) -> Result<CorrectionIndexTable> {
    let raw: BTreeMap<String, f64> = serde_json::from_reader(reader)?;
    correction_from_map(raw, "correction index JSON")
}

/// Load a correction index table from a script literal
/// (`const name = { '2020-01': 1.5, 2020-02: 1.6, };`)
pub fn read_correction_index_js<R: Read>(mut reader: R) -> Result<CorrectionIndexTable> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let literal = literal_between(&text, '{', '}').ok_or_else(|| {
        RestatementError::MalformedScript("no object literal in correction index".to_string())
    })?;
    let raw: BTreeMap<String, f64> = serde_json::from_str(&script_literal_to_json(literal))?;
    correction_from_map(raw, "correction index script")
}

/// Load a correction index table in an explicit format
pub fn load_correction_index_as(path: &Path, format: TableFormat) -> Result<CorrectionIndexTable> {
    let file = File::open(path)?;
    match format {
        TableFormat::Csv => read_correction_index(file),
        TableFormat::Json => read_correction_index_json(file),
        TableFormat::Script => read_correction_index_js(file),
    }
}

/// Load a correction index table, choosing the format from the file extension
pub fn load_correction_index(path: &Path) -> Result<CorrectionIndexTable> {
    load_correction_index_as(path, TableFormat::from_path(path))
}

/// Load an allowance schedule from any CSV reader
pub fn read_allowance<R: Read>(reader: R) -> Result<AllowanceSchedule> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for (i, result) in csv_reader.deserialize().enumerate() {
        let record: AllowanceCsvRow = result?;
        let row = i + 1;
        let date = parse_date_field(ALLOWANCE_FILE, row, &record.effective_date)?;
        let value = parse_number_field(ALLOWANCE_FILE, row, &record.value)?;
        entries.push((date, value));
    }

    Ok(AllowanceSchedule::from_entries(entries))
}

/// Load a factor series from any CSV reader. `table` names the source in errors.
pub fn read_factor_series<R: Read>(reader: R, table: &str) -> Result<FactorSeries> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for (i, result) in csv_reader.deserialize().enumerate() {
        let record: FactorCsvRow = result?;
        let row = i + 1;
        let date = parse_date_field(table, row, &record.date)?;
        let factor = parse_number_field(table, row, &record.factor)?;
        entries.push((date, factor));
    }

    Ok(FactorSeries::from_entries(entries))
}

/// Load a factor series from a script array literal
/// (`const name = [ { date: '2020-01-01', factor: 0.005 }, ];`).
/// Strict JSON arrays of the same shape are accepted too.
pub fn read_factor_series_js<R: Read>(mut reader: R, table: &str) -> Result<FactorSeries> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let literal = literal_between(&text, '[', ']')
        .ok_or_else(|| RestatementError::MalformedScript(format!("no array literal in {table}")))?;
    let raw: Vec<FactorEntry> = serde_json::from_str(&script_literal_to_json(literal))?;

    let mut entries = Vec::with_capacity(raw.len());
    for (i, entry) in raw.into_iter().enumerate() {
        entries.push((parse_date_field(table, i + 1, &entry.date)?, entry.factor));
    }
    Ok(FactorSeries::from_entries(entries))
}

/// Load a factor series in an explicit format
pub fn load_factor_series_as(path: &Path, format: TableFormat) -> Result<FactorSeries> {
    let file = File::open(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match format {
        TableFormat::Csv => read_factor_series(file, &name),
        TableFormat::Json | TableFormat::Script => read_factor_series_js(file, &name),
    }
}

pub fn load_factor_series(path: &Path) -> Result<FactorSeries> {
    load_factor_series_as(path, TableFormat::from_path(path))
}

/// Write a correction index table as `month,index` CSV
pub fn write_correction_index<W: Write>(table: &CorrectionIndexTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["month", "index"])?;
    for (month, index) in table.iter() {
        csv_writer.write_record([month.to_string(), index.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a correction index table as `const name = { "YYYY-MM": index };`
pub fn write_correction_index_js<W: Write>(
    table: &CorrectionIndexTable,
    name: &str,
    mut writer: W,
) -> Result<()> {
    let map: BTreeMap<String, f64> = table.iter().map(|(m, v)| (m.to_string(), *v)).collect();
    writeln!(writer, "const {} = {};", name, serde_json::to_string_pretty(&map)?)?;
    writer.flush()?;
    Ok(())
}

/// Write a correction index table as a JSON map `{"YYYY-MM": index}`
pub fn write_correction_index_json<W: Write>(
    table: &CorrectionIndexTable,
    writer: W,
) -> Result<()> {
    let map: BTreeMap<String, f64> = table.iter().map(|(m, v)| (m.to_string(), *v)).collect();
    serde_json::to_writer_pretty(writer, &map)?;
    Ok(())
}

/// Write a factor series as a JSON array of `{"date": ..., "factor": ...}`
pub fn write_factor_series_json<W: Write>(series: &FactorSeries, writer: W) -> Result<()> {
    let entries: Vec<FactorEntry> = series
        .entries()
        .iter()
        .map(|(date, factor)| FactorEntry {
            date: date.format("%Y-%m-%d").to_string(),
            factor: *factor,
        })
        .collect();
    serde_json::to_writer_pretty(writer, &entries)?;
    Ok(())
}

/// Write a factor series as `date,factor` CSV
pub fn write_factor_series<W: Write>(series: &FactorSeries, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["date", "factor"])?;
    for (date, factor) in series.entries() {
        csv_writer.write_record([date.format("%Y-%m-%d").to_string(), factor.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a factor series as `const name = [ { date: '...', factor: x }, ];`
pub fn write_factor_series_js<W: Write>(
    series: &FactorSeries,
    name: &str,
    mut writer: W,
) -> Result<()> {
    writeln!(writer, "const {} = [", name)?;
    for (date, factor) in series.entries() {
        writeln!(writer, "  {{ date: '{}', factor: {} }},", date.format("%Y-%m-%d"), factor)?;
    }
    writeln!(writer, "];")?;
    writer.flush()?;
    Ok(())
}

/// Name declared by the first `const <name> =` in a script file
pub fn declared_script_name(text: &str) -> Option<&str> {
    let start = text.find("const ")? + "const ".len();
    let rest = &text[start..];
    let name = rest[..rest.find('=')?].trim();
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    valid.then_some(name)
}

/// Text from the first `open` through the last `close`, inclusive
fn literal_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

fn is_bare_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-' | '+' | '.')
}

/// Rewrite a JavaScript object or array literal as JSON. Single-quoted
/// strings become double-quoted, bare keys are quoted, and trailing commas
/// before `}` or `]` are dropped.
fn script_literal_to_json(literal: &str) -> String {
    let chars: Vec<char> = literal.chars().collect();
    let mut out = String::with_capacity(literal.len() + 32);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '"' {
                        out.push('\\');
                    }
                    out.push(chars[i]);
                    i += 1;
                }
                out.push('"');
                i += 1;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if is_bare_token_char(c) => {
                let start = i;
                while i < chars.len() && is_bare_token_char(chars[i]) {
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                let is_key = chars[i..].iter().find(|ch| !ch.is_whitespace()) == Some(&':');
                if is_key {
                    out.push('"');
                    out.push_str(&token);
                    out.push('"');
                } else {
                    out.push_str(&token);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Raw tables loaded from a directory
pub struct LoadedTables {
    pub correction: CorrectionIndexTable,
    pub allowance: AllowanceSchedule,
    pub savings: FactorSeries,
    pub treasury: FactorSeries,
}

impl LoadedTables {
    /// Load all tables from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_TABLES_PATH))
    }

    /// Load all tables from a specific directory
    pub fn load_from(path: &Path) -> Result<Self> {
        let correction_json = path.join("correction_index.json");
        let correction = if correction_json.exists() {
            load_correction_index(&correction_json)?
        } else {
            load_correction_index(&path.join(CORRECTION_INDEX_FILE))?
        };
        if correction.is_empty() {
            return Err(RestatementError::EmptyTable(CORRECTION_INDEX_FILE.to_string()));
        }

        let allowance = read_allowance(File::open(path.join(ALLOWANCE_FILE))?)?;
        let savings = load_factor_series(&path.join(SAVINGS_FACTORS_FILE))?;
        let treasury = load_factor_series(&path.join(TREASURY_FACTORS_FILE))?;

        log::info!(
            "loaded tables from {}: {} correction months, {} allowance entries, \
             {} savings / {} treasury factors",
            path.display(),
            correction.len(),
            allowance.len(),
            savings.len(),
            treasury.len(),
        );

        Ok(Self {
            correction,
            allowance,
            savings,
            treasury,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_read_correction_index_csv() {
        let data = "month,index\n2020-01,55.10\n2020-02,\"55,42\"\n";
        let table = read_correction_index(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get_exact(&key("2020-02")), Some(55.42));
    }

    #[test]
    fn test_thousands_grouped_numbers() {
        let data = "month,index\n2020-01,\"1.234,5678\"\n2020-02,\"12.345.678,9\"\n";
        let table = read_correction_index(data.as_bytes()).unwrap();

        assert_eq!(table.get_exact(&key("2020-01")), Some(1234.5678));
        assert_eq!(table.get_exact(&key("2020-02")), Some(12345678.9));
    }

    #[test]
    fn test_read_correction_index_json() {
        let data = r#"{"2020-01": 55.1, "2020-02": 55.42}"#;
        let table = read_correction_index_json(data.as_bytes()).unwrap();
        assert_eq!(table.first_month().unwrap().to_string(), "2020-01");
        assert_eq!(table.last_month().unwrap().to_string(), "2020-02");
    }

    #[test]
    fn test_read_correction_index_script() {
        let data = "// published index\nconst indexTable = {\n  '2020-01': 55.1,\n  \
                    2020-02 : 55.42,\n  \"2020-03\": 56,\n};\n";
        let table = read_correction_index_js(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get_exact(&key("2020-01")), Some(55.1));
        assert_eq!(table.get_exact(&key("2020-02")), Some(55.42));
        assert_eq!(table.get_exact(&key("2020-03")), Some(56.0));
        assert_eq!(declared_script_name(data), Some("indexTable"));
    }

    #[test]
    fn test_correction_script_write_then_read() {
        let table =
            CorrectionIndexTable::from_entries([(key("2020-01"), 1.5), (key("2020-02"), 1.25)]);
        let mut out = Vec::new();
        write_correction_index_js(&table, "indexTable", &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("const indexTable = {"));
        assert!(text.trim_end().ends_with("};"));

        let reread = read_correction_index_js(text.as_bytes()).unwrap();
        assert_eq!(reread.get_exact(&key("2020-01")), Some(1.5));
        assert_eq!(reread.get_exact(&key("2020-02")), Some(1.25));
    }

    #[test]
    fn test_read_factor_series_script() {
        let data = "const savingsFactors = [\n  { date: '2021-03-18', factor: 0.002 },\n  \
                    { date: \"2021-04-01\", factor: 0.0031 },\n];\n";
        let series = read_factor_series_js(data.as_bytes(), "savings").unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.factor_for(key("2021-03")), 0.002);
        assert_eq!(series.factor_for(key("2021-04")), 0.0031);
    }

    #[test]
    fn test_factor_series_script_write_then_read() {
        let data = "date,factor\n2020-01-01,0.005\n2020-02-01,1e-7\n";
        let series = read_factor_series(data.as_bytes(), "t").unwrap();
        let mut out = Vec::new();
        write_factor_series_js(&series, "treasuryFactors", &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("{ date: '2020-01-01', factor: 0.005 },"));

        let reread = read_factor_series_js(text.as_bytes(), "treasury").unwrap();
        assert_eq!(reread.entries(), series.entries());
    }

    #[test]
    fn test_json_writers_read_back() {
        let table = CorrectionIndexTable::from_entries([(key("2020-01"), 1.5)]);
        let mut out = Vec::new();
        write_correction_index_json(&table, &mut out).unwrap();
        let reread = read_correction_index_json(out.as_slice()).unwrap();
        assert_eq!(reread.get_exact(&key("2020-01")), Some(1.5));

        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let series = FactorSeries::from_entries([(day, 0.25)]);
        let mut out = Vec::new();
        write_factor_series_json(&series, &mut out).unwrap();
        let reread = read_factor_series_js(out.as_slice(), "json").unwrap();
        assert_eq!(reread.entries(), series.entries());
    }

    #[test]
    fn test_script_without_literal_is_rejected() {
        let err = read_factor_series_js("const x = 1;".as_bytes(), "broken").unwrap_err();
        assert!(matches!(err, RestatementError::MalformedScript(_)));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a/index.JS")), TableFormat::Script);
        assert_eq!(TableFormat::from_path(Path::new("index.json")), TableFormat::Json);
        assert_eq!(TableFormat::from_path(Path::new("index.csv")), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("index")), TableFormat::Csv);
    }

    #[test]
    fn test_invalid_month_reports_row() {
        let data = "month,index\n2020-01,1.0\n2020-1x,2.0\n";
        let err = read_correction_index(data.as_bytes()).unwrap_err();
        match err {
            RestatementError::InvalidMonthKey { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "2020-1x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_allowance_and_factors() {
        let allowance =
            read_allowance("effective_date,value\n2019-01-01,300\n".as_bytes()).unwrap();
        assert_eq!(allowance.len(), 1);

        let factors =
            read_factor_series("date,factor\n2020-01-04,0.005\n".as_bytes(), "test").unwrap();
        assert_eq!(factors.factor_for(key("2020-01")), 0.005);
    }

    #[test]
    fn test_write_csv_round_trip() {
        let table = read_correction_index("month,index\n2020-01,1.5\n".as_bytes()).unwrap();
        let mut out = Vec::new();
        write_correction_index(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "month,index\n2020-01,1.5\n");

        let series = read_factor_series("date,factor\n2020-01-04,0.005\n".as_bytes(), "t").unwrap();
        let mut out = Vec::new();
        write_factor_series(&series, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "date,factor\n2020-01-04,0.005\n");
    }

    #[test]
    fn test_load_default_tables() {
        let result = LoadedTables::load_default();
        assert!(result.is_ok(), "Failed to load tables: {:?}", result.err());

        let tables = result.unwrap();
        assert!(!tables.correction.is_empty());
        assert!(!tables.allowance.is_empty());
        assert!(!tables.savings.is_empty());
        assert!(!tables.treasury.is_empty());
    }
}
