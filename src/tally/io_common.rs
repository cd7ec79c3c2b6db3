use log::{debug, warn};
use score_ledger::{PeriodNaming, Sheet};
use snafu::prelude::*;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tally::io_csv::read_csv_sheet;
use crate::tally::io_xlsx::read_xlsx_sheet;
use crate::tally::{DiscoverySnafu, TallyResult, UnsupportedFileSnafu};

/// Lists the period files of a directory, sorted by path.
///
/// The summary file is never a period file, even if its name follows the naming.
pub fn discover_period_files(
    input_dir: &Path,
    naming: &PeriodNaming,
    summary_path: &Path,
) -> TallyResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*{}",
        glob::Pattern::escape(&input_dir.display().to_string()),
        glob::Pattern::escape(&naming.prefix),
        glob::Pattern::escape(&naming.suffix)
    );
    debug!("discover_period_files: pattern: {:?}", pattern);
    let entries = glob::glob(&pattern).context(DiscoverySnafu {
        pattern: pattern.clone(),
    })?;
    let summary = fs::canonicalize(summary_path).ok();
    let mut res: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Cannot access {}: {}", e.path().display(), e.error());
                None
            }
        })
        .filter(|p| p.is_file())
        .filter(|p| summary.is_none() || fs::canonicalize(p).ok() != summary)
        .collect();
    res.sort();
    Ok(res)
}

/// Reads the first worksheet (or the named one) of a spreadsheet, by file extension.
pub fn read_sheet(path: &Path, worksheet_name: Option<&str>) -> TallyResult<Sheet> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => read_xlsx_sheet(path, worksheet_name),
        Some("csv") => read_csv_sheet(path),
        _ => UnsupportedFileSnafu {
            path: path.display().to_string(),
        }
        .fail(),
    }
}

/// The message of an error followed by the messages of its causes.
pub fn describe_error(e: &dyn Error) -> String {
    let mut res = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        res.push_str(": ");
        res.push_str(&cause.to_string());
        source = cause.source();
    }
    res
}
