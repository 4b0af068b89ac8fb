use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ontrack_core::csv_io;
use ontrack_core::db::Database;
use ontrack_core::models::ImportReport;

use crate::config::export_path;

pub(crate) fn cmd_export_habits(
    db: &Database,
    data_dir: &Path,
    out: Option<PathBuf>,
) -> Result<()> {
    let path = out.unwrap_or_else(|| export_path(data_dir, "habits"));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    csv_io::export_habit_logs(db, BufWriter::new(file))?;
    println!("Exported habit logs to {}", path.display());
    Ok(())
}

pub(crate) fn cmd_export_timeblocks(
    db: &Database,
    data_dir: &Path,
    out: Option<PathBuf>,
) -> Result<()> {
    let path = out.unwrap_or_else(|| export_path(data_dir, "timeblocks"));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    csv_io::export_time_blocks(db, BufWriter::new(file))?;
    println!("Exported time blocks to {}", path.display());
    Ok(())
}

pub(crate) fn cmd_import_habits(db: &Database, file: &Path, json: bool) -> Result<()> {
    let reader = File::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let report = csv_io::import_habit_logs(db, reader)?;
    print_report(&report, "habit logs", json)
}

pub(crate) fn cmd_import_timeblocks(db: &Database, file: &Path, json: bool) -> Result<()> {
    let reader = File::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let report = csv_io::import_time_blocks(db, reader)?;
    print_report(&report, "time blocks", json)
}

fn print_report(report: &ImportReport, what: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let imported = report.imported;
    println!("Imported {imported} {what}");
    if !report.errors.is_empty() {
        let failed = report.errors.len();
        eprintln!("{failed} rows failed:");
        for error in &report.errors {
            eprintln!("  {error}");
        }
    }
    Ok(())
}
