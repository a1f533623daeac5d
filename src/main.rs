//! Salary Restatement CLI
//!
//! Command-line driver for restating a case and maintaining reference tables.
//! Table files are replaced through a backup and an atomic rename.
//! Verbosity is controlled by `RUST_LOG`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use salary_restatement::case::{load_case, load_overrides, save_overrides};
use salary_restatement::ledger::{CellValue, ColumnKind, LEDGER_COLUMNS};
use salary_restatement::tables::compare::{
    check_correction_regression, check_regression, diff_correction_tables, merge_new_entries,
    monthly_from_daily_annual_252, splice_series, RegressionMode, RegressionReport,
};
use salary_restatement::tables::loader::{
    declared_script_name, load_correction_index, load_correction_index_as, load_factor_series,
    load_factor_series_as, write_correction_index, write_correction_index_js,
    write_correction_index_json, write_factor_series, write_factor_series_js,
    write_factor_series_json, TableFormat, DEFAULT_SCRIPT_NAME, DEFAULT_TABLES_PATH,
};
use salary_restatement::tables::store::{
    latest_backup, replace_with_backup, restore_backup, DEFAULT_BACKUP_DIR,
};
use salary_restatement::tables::{CorrectionIndexTable, FactorSeries};
use salary_restatement::{CaseRunner, EditScope, LedgerResult, MonthKey, OverrideField};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "restate", version, about = "Month-by-month salary restatement ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Restate a case and write the ledger
    Run {
        /// Case configuration (JSON)
        #[arg(long)]
        case: PathBuf,
        /// Manual overrides (JSON); missing file means no overrides
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Directory holding the reference tables
        #[arg(long, default_value = DEFAULT_TABLES_PATH)]
        tables: PathBuf,
        /// Ledger output path
        #[arg(long, default_value = "restatement_output.csv")]
        output: PathBuf,
        /// Write rows and totals as JSON instead of CSV
        #[arg(long)]
        json: bool,
        /// Rows to echo to the console
        #[arg(long, default_value_t = 24)]
        preview: usize,
    },
    /// Record a manual edit in an overrides file
    Edit {
        /// Case configuration (JSON), used to bound the edit to the ledger
        #[arg(long)]
        case: PathBuf,
        /// Overrides file to update (created if missing)
        #[arg(long)]
        overrides: PathBuf,
        /// 0-based row index
        #[arg(long)]
        row: usize,
        #[arg(long, value_enum)]
        field: FieldArg,
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
        /// Apply to this many rows starting at `row`
        #[arg(long, conflicts_with = "to_end")]
        count: Option<usize>,
        /// Apply from `row` through the last row
        #[arg(long)]
        to_end: bool,
    },
    /// Show new and changed entries between two correction index tables
    CompareTables { original: PathBuf, updated: PathBuf },
    /// Add the months of `incoming` missing from `existing`, never overwriting
    MergeTables {
        existing: PathBuf,
        incoming: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_BACKUP_DIR)]
        backup_dir: PathBuf,
    },
    /// Fail if a new factor series lost periods the old one had
    CheckRegression {
        old: PathBuf,
        new: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Month)]
        mode: ModeArg,
        /// Also fail when an existing period's value changed
        #[arg(long)]
        check_values: bool,
    },
    /// Check a table file against its most recent backup
    Verify {
        target: PathBuf,
        #[arg(long, default_value = DEFAULT_BACKUP_DIR)]
        backup_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = KindArg::Factors)]
        kind: KindArg,
        #[arg(long, value_enum, default_value_t = ModeArg::Month)]
        mode: ModeArg,
        #[arg(long)]
        check_values: bool,
    },
    /// Put the most recent backup of a table file back in place
    RestoreLast {
        target: PathBuf,
        #[arg(long, default_value = DEFAULT_BACKUP_DIR)]
        backup_dir: PathBuf,
    },
    /// Join an older and a newer edition of a series at a cutoff month
    SpliceSeries {
        old: PathBuf,
        new: PathBuf,
        /// First month taken from the newer edition (the current savings rule
        /// starts in 2012-06)
        #[arg(long, default_value = "2012-06")]
        cutoff: MonthKey,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_BACKUP_DIR)]
        backup_dir: PathBuf,
    },
    /// Build monthly factors from daily annual rates (percent, 252-day basis)
    CompoundDaily {
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_BACKUP_DIR)]
        backup_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Base,
    Allowance,
    Floor,
    SeniorityPct,
    SeniorityValue,
    OneSixth,
    Retp,
}

impl From<FieldArg> for OverrideField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Base => OverrideField::Base,
            FieldArg::Allowance => OverrideField::Allowance,
            FieldArg::Floor => OverrideField::Floor,
            FieldArg::SeniorityPct => OverrideField::SeniorityPct,
            FieldArg::SeniorityValue => OverrideField::SeniorityValue,
            FieldArg::OneSixth => OverrideField::OneSixth,
            FieldArg::Retp => OverrideField::Retp,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Correction,
    Factors,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Month,
    Strict,
}

impl From<ModeArg> for RegressionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Month => RegressionMode::Month,
            ModeArg::Strict => RegressionMode::Strict,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { case, overrides, tables, output, json, preview } => {
            run_case(case, overrides, tables, output, json, preview)
        }
        Command::Edit { case, overrides, row, field, value, count, to_end } => {
            let scope = match (count, to_end) {
                (_, true) => EditScope::ToEnd,
                (Some(n), false) => EditScope::Count(n),
                (None, false) => EditScope::One,
            };
            edit_overrides(case, overrides, row, field.into(), value, scope)
        }
        Command::CompareTables { original, updated } => compare_tables(original, updated),
        Command::MergeTables { existing, incoming, output, backup_dir } => {
            merge_tables(existing, incoming, output, backup_dir)
        }
        Command::CheckRegression { old, new, mode, check_values } => {
            regression(old, new, mode.into(), check_values)
        }
        Command::Verify { target, backup_dir, kind, mode, check_values } => {
            verify(target, backup_dir, kind, mode.into(), check_values)
        }
        Command::RestoreLast { target, backup_dir } => restore_last(target, backup_dir),
        Command::SpliceSeries { old, new, cutoff, output, backup_dir } => {
            let old_series = load_series(&old)?;
            let new_series = load_series(&new)?;
            let spliced = splice_series(&old_series, &new_series, cutoff);
            println!("{} months after splicing at {}", spliced.len(), cutoff);
            save_series(&spliced, &output, &backup_dir)
        }
        Command::CompoundDaily { input, output, backup_dir } => {
            let daily = load_series(&input)?;
            let monthly = monthly_from_daily_annual_252(daily.entries());
            println!("{} daily quotes compounded into {} months", daily.len(), monthly.len());
            save_series(&monthly, &output, &backup_dir)
        }
    }
}

fn run_case(
    case_path: PathBuf,
    overrides_path: Option<PathBuf>,
    tables: PathBuf,
    output: PathBuf,
    json: bool,
    preview: usize,
) -> Result<()> {
    let case = load_case(&case_path)
        .with_context(|| format!("loading case {}", case_path.display()))?;
    let overrides = match overrides_path {
        Some(path) => load_overrides(&path)
            .with_context(|| format!("loading overrides {}", path.display()))?,
        None => Default::default(),
    };
    let runner = CaseRunner::from_csv_path(&tables)
        .with_context(|| format!("loading reference tables from {}", tables.display()))?;

    let result = runner.run(&case, &overrides);
    log::info!(
        "restated {} months, {} overridden rows, total {:.2}",
        result.len(),
        overrides.len(),
        result.totals.total
    );

    print_preview(&result, preview);

    let file = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    if json {
        serde_json::to_writer_pretty(BufWriter::new(file), &result)?;
    } else {
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        for row in &result.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    println!("\nFull ledger written to: {}", output.display());

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Months: {}", summary.total_months);
    if let (Some(first), Some(last)) = (summary.first_month, summary.last_month) {
        println!("  Range: {} .. {}", first, last);
    }
    println!("  Corrected value: {:.2}", summary.total_corrected);
    println!("  Periodic benefits: {:.2}", summary.total_benefits);
    println!("  Interest: {:.2}", summary.total_interest);
    println!("  Deductions/additions: {:.2}", summary.total_adjustments);
    println!("  Total: {:.2}", summary.grand_total);

    Ok(())
}

fn format_cell(kind: ColumnKind, value: &CellValue) -> String {
    match (kind, value) {
        (_, CellValue::Integer(n)) => n.to_string(),
        (_, CellValue::Text(s)) => s.clone(),
        (ColumnKind::Factor, CellValue::Number(x)) => format!("{:.6}", x),
        (_, CellValue::Number(x)) => format!("{:.2}", x),
    }
}

/// Echo the leading rows and the totals line for a few key columns
fn print_preview(result: &LedgerResult, rows: usize) {
    const PREVIEW_KEYS: [&str; 8] = [
        "sequence",
        "month",
        "sub_base",
        "correction_index",
        "corrected_value",
        "subtotal",
        "subtotal_after_treasury",
        "total",
    ];
    let columns: Vec<_> = LEDGER_COLUMNS
        .iter()
        .filter(|c| PREVIEW_KEYS.contains(&c.key))
        .collect();

    let header: Vec<String> = columns.iter().map(|c| format!("{:>14}", c.label)).collect();
    println!("{}", header.join(" "));
    println!("{}", "-".repeat(15 * columns.len()));

    for row in result.rows.iter().take(rows) {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| format!("{:>14}", format_cell(c.kind, &(c.cell)(row))))
            .collect();
        println!("{}", cells.join(" "));
    }
    if result.rows.len() > rows {
        println!("... ({} more months)", result.rows.len() - rows);
    }

    let totals: Vec<String> = columns
        .iter()
        .map(|c| match c.total {
            Some(total) => {
                let value = CellValue::Number(total(&result.totals));
                format!("{:>14}", format_cell(c.kind, &value))
            }
            None if c.kind == ColumnKind::Month => format!("{:>14}", "Totals"),
            None => format!("{:>14}", ""),
        })
        .collect();
    println!("{}", totals.join(" "));
}

fn edit_overrides(
    case_path: PathBuf,
    overrides_path: PathBuf,
    row: usize,
    field: OverrideField,
    value: f64,
    scope: EditScope,
) -> Result<()> {
    if !value.is_finite() {
        bail!("override value must be a finite number");
    }
    let case = load_case(&case_path)
        .with_context(|| format!("loading case {}", case_path.display()))?;
    let overrides = load_overrides(&overrides_path)?;

    let row_count = case.row_count();
    if row >= row_count {
        bail!("row {} is outside the ledger ({} rows)", row, row_count);
    }

    let updated = overrides.with_edit(row, field, value, scope, row_count);
    let file = File::create(&overrides_path)
        .with_context(|| format!("writing {}", overrides_path.display()))?;
    save_overrides(&updated, BufWriter::new(file))?;

    let stored = updated.get(row).and_then(|values| values.get(field));
    if let Some(value) = stored {
        println!("Row {}: {:?} = {}", row, field, value);
    }
    println!("{} rows now carry overrides", updated.len());
    Ok(())
}

fn compare_tables(original: PathBuf, updated: PathBuf) -> Result<()> {
    let original_table = load_correction_index(&original)
        .with_context(|| format!("loading {}", original.display()))?;
    let updated_table = load_correction_index(&updated)
        .with_context(|| format!("loading {}", updated.display()))?;

    let diff = diff_correction_tables(&original_table, &updated_table);

    println!("New entries in the updated table:");
    for (month, value) in &diff.added {
        println!("+ {}: {}", month, value);
    }
    println!("\nValues changed from the original:");
    for (month, before, after) in &diff.changed {
        println!("* {}: {} -> {}", month, before, after);
    }
    if !diff.removed.is_empty() {
        println!("\nEntries missing from the updated table:");
        for month in &diff.removed {
            println!("- {}", month);
        }
    }

    println!("\nStatistics:");
    println!("  Original entries: {}", diff.original_len);
    println!("  Updated entries:  {}", diff.updated_len);
    println!("  New:              {}", diff.added.len());
    println!("  Changed:          {}", diff.changed.len());
    println!("  Missing:          {}", diff.removed.len());
    Ok(())
}

fn merge_tables(
    existing: PathBuf,
    incoming: PathBuf,
    output: PathBuf,
    backup_dir: PathBuf,
) -> Result<()> {
    let existing_table = load_correction_index(&existing)
        .with_context(|| format!("loading {}", existing.display()))?;
    let incoming_table = load_correction_index(&incoming)
        .with_context(|| format!("loading {}", incoming.display()))?;

    let (merged, added) = merge_new_entries(&existing_table, &incoming_table);
    if added.is_empty() {
        println!("No new entries. Nothing to do.");
        return Ok(());
    }

    // Keep the declared name when rewriting a script file in place
    let name_source = if output.exists() { &output } else { &existing };
    save_correction(&merged, &output, &backup_dir, &script_name(name_source))?;
    println!("{} new entries added; written to {}", added.len(), output.display());
    Ok(())
}

fn regression(old: PathBuf, new: PathBuf, mode: RegressionMode, check_values: bool) -> Result<()> {
    let old_series = load_series(&old)?;
    let new_series = load_series(&new)?;
    report_regression(check_regression(&old_series, &new_series, mode, check_values))
}

fn verify(
    target: PathBuf,
    backup_dir: PathBuf,
    kind: KindArg,
    mode: RegressionMode,
    check_values: bool,
) -> Result<()> {
    let Some(backup) = latest_backup(&target, &backup_dir)? else {
        println!("No backups to verify for {}", target.display());
        return Ok(());
    };
    println!("Verifying {} against {}", target.display(), backup.display());

    // Backups keep the target's encoding under a .bak name
    let format = TableFormat::from_path(&target);
    let report = match kind {
        KindArg::Correction => {
            let before = load_correction_index_as(&backup, format)
                .with_context(|| format!("loading {}", backup.display()))?;
            let current = load_correction_index(&target)
                .with_context(|| format!("loading {}", target.display()))?;
            check_correction_regression(&before, &current, check_values)
        }
        KindArg::Factors => {
            let before = load_factor_series_as(&backup, format)
                .with_context(|| format!("loading {}", backup.display()))?;
            let current = load_series(&target)?;
            check_regression(&before, &current, mode, check_values)
        }
    };
    report_regression(report)
}

fn restore_last(target: PathBuf, backup_dir: PathBuf) -> Result<()> {
    let backup = latest_backup(&target, &backup_dir)?.with_context(|| {
        format!("no backups of {} in {}", target.display(), backup_dir.display())
    })?;
    restore_backup(&backup, &target)?;
    println!("Restored {} from {}", target.display(), backup.display());
    Ok(())
}

fn report_regression(report: RegressionReport) -> Result<()> {
    if report.passed() {
        println!("Check: OK");
        return Ok(());
    }

    if !report.lost.is_empty() {
        println!("Lost periods: {}", report.lost.join(", "));
    }
    if !report.changed.is_empty() {
        println!("Changed periods: {}", report.changed.join(", "));
    }
    bail!("regression detected")
}

fn load_series(path: &Path) -> Result<FactorSeries> {
    load_factor_series(path).with_context(|| format!("loading {}", path.display()))
}

/// Declared name of an existing script file, or the default
fn script_name(path: &Path) -> String {
    fs::read_to_string(path)
        .ok()
        .as_deref()
        .and_then(declared_script_name)
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_SCRIPT_NAME.to_string())
}

fn save_correction(
    table: &CorrectionIndexTable,
    output: &Path,
    backup_dir: &Path,
    name: &str,
) -> Result<()> {
    let format = TableFormat::from_path(output);
    let backup = replace_with_backup(output, backup_dir, |w| match format {
        TableFormat::Csv => write_correction_index(table, w),
        TableFormat::Json => write_correction_index_json(table, w),
        TableFormat::Script => write_correction_index_js(table, name, w),
    })
    .with_context(|| format!("writing {}", output.display()))?;

    if let Some(path) = backup {
        println!("Previous edition saved to {}", path.display());
    }
    Ok(())
}

/// Replace a series file, refusing when the new series lost months the
/// current file has
fn save_series(series: &FactorSeries, output: &Path, backup_dir: &Path) -> Result<()> {
    if output.exists() {
        let current = load_series(output)?;
        let report = check_regression(&current, series, RegressionMode::Month, false);
        if !report.passed() {
            println!("Lost periods: {}", report.lost.join(", "));
            bail!("refusing to replace {}: regression detected", output.display());
        }
    }

    let format = TableFormat::from_path(output);
    let name = script_name(output);
    let backup = replace_with_backup(output, backup_dir, |w| match format {
        TableFormat::Csv => write_factor_series(series, w),
        TableFormat::Json => write_factor_series_json(series, w),
        TableFormat::Script => write_factor_series_js(series, &name, w),
    })
    .with_context(|| format!("writing {}", output.display()))?;

    if let Some(path) = backup {
        println!("Previous edition saved to {}", path.display());
    }
    println!("{} entries written to {}", series.len(), output.display());
    Ok(())
}
