//! Restate every case in a directory
//!
//! Each `<name>.json` is a case; an optional `<name>.overrides.json` next to
//! it holds that case's manual overrides. Writes one summary line per case.
//!
//! Usage: run_batch <cases_dir> [tables_dir] [output.csv]

use anyhow::{Context, Result};
use salary_restatement::case::{load_case, load_overrides};
use salary_restatement::tables::loader::DEFAULT_TABLES_PATH;
use salary_restatement::{CaseConfig, CaseRunner, OverrideTable};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const OVERRIDES_SUFFIX: &str = ".overrides.json";

#[derive(Debug, Serialize)]
struct BatchRow {
    case: String,
    months: u32,
    first_month: String,
    last_month: String,
    corrected: f64,
    benefits: f64,
    interest: f64,
    adjustments: f64,
    total: f64,
}

fn collect_cases(dir: &Path) -> Result<Vec<(String, CaseConfig, OverrideTable)>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            name.ends_with(".json") && !name.ends_with(OVERRIDES_SUFFIX)
        })
        .collect();
    paths.sort();

    let mut cases = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let case = load_case(&path).with_context(|| format!("loading case {}", path.display()))?;
        let overrides = load_overrides(dir.join(format!("{}{}", stem, OVERRIDES_SUFFIX)))?;
        cases.push((stem, case, overrides));
    }

    Ok(cases)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cases_dir = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("cases"));
    let tables_dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or(DEFAULT_TABLES_PATH));
    let output_path = PathBuf::from(args.get(3).map(String::as_str).unwrap_or("batch_summary.csv"));

    let start = Instant::now();
    let runner = CaseRunner::from_csv_path(&tables_dir)
        .with_context(|| format!("loading reference tables from {}", tables_dir.display()))?;

    let named = collect_cases(&cases_dir)?;
    println!("Loaded {} cases in {:?}", named.len(), start.elapsed());

    let inputs: Vec<(CaseConfig, OverrideTable)> = named
        .iter()
        .map(|(_, case, overrides)| (case.clone(), overrides.clone()))
        .collect();

    let run_start = Instant::now();
    let results = runner.run_batch(&inputs);
    println!("Restatements complete in {:?}", run_start.elapsed());

    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    for ((name, _, _), result) in named.iter().zip(&results) {
        let summary = result.summary();
        writer.serialize(BatchRow {
            case: name.clone(),
            months: summary.total_months,
            first_month: summary.first_month.map(|m| m.to_string()).unwrap_or_default(),
            last_month: summary.last_month.map(|m| m.to_string()).unwrap_or_default(),
            corrected: summary.total_corrected,
            benefits: summary.total_benefits,
            interest: summary.total_interest,
            adjustments: summary.total_adjustments,
            total: summary.grand_total,
        })?;
    }
    writer.flush()?;

    let grand_total: f64 = results.iter().map(|r| r.totals.total).sum();
    println!("Grand total across cases: {:.2}", grand_total);
    println!("Summary written to: {}", output_path.display());
    Ok(())
}
