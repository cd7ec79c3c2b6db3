use log::{debug, info, warn};

use score_ledger::*;
use snafu::Snafu;

use std::path::{Path, PathBuf};

use crate::args::{Args, ModeArg};

mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;
mod summary_json;
mod summary_writer;

use config_reader::{read_config, TallyConfig};
pub use io_common::describe_error;
use io_common::{discover_period_files, read_sheet};
use summary_json::{check_reference, write_summary_json};
use summary_writer::write_summary;

/// The name of the summary file, unless configured otherwise.
pub const DEFAULT_OUTPUT_FILE: &str = "活动总分汇总表.xlsx";
/// The name of the worksheet in the summary file.
pub const DEFAULT_SHEET_TITLE: &str = "总分汇总";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of file {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Unsupported file type: {path}"))]
    UnsupportedFile { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Invalid file pattern {pattern}"))]
    Discovery {
        source: glob::PatternError,
        pattern: String,
    },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error replacing {path} with {from}"))]
    RenamingSummary {
        source: std::io::Error,
        from: String,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the summary and the reference summary {path}"))]
    ReferenceMismatch { path: String },
}

pub type TallyResult<T> = Result<T, TallyError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RunMode {
    /// Load the existing summary, only read the new periods.
    Update,
    /// Start from scratch.
    Regenerate,
}

/// Everything a run needs, after merging the defaults, the configuration file and the
/// command line.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallySettings {
    pub input_dir: PathBuf,
    pub naming: PeriodNaming,
    pub columns: ColumnNames,
    pub output_path: PathBuf,
    pub worksheet_name: Option<String>,
    pub sheet_title: String,
    pub mode: RunMode,
    pub json_out: Option<String>,
    pub reference: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RunOutcome {
    /// The summary was written.
    Written { participants: usize, periods: usize },
    /// No file matched the period naming.
    NoInputFiles,
    /// Files were found but none was consumed. Nothing was written.
    Unchanged(BatchOutcome),
}

/// Resolves the settings: command line flags take precedence over the configuration
/// file, which takes precedence over the defaults.
///
/// Relative paths of the configuration file are relative to its directory.
pub fn settings_from_args(args: &Args) -> TallyResult<TallySettings> {
    let (config, base_dir): (TallyConfig, PathBuf) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let base_dir = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, base_dir)
        }
        None => (TallyConfig::default(), PathBuf::new()),
    };
    debug!("settings_from_args: config: {:?}", config);

    let input_dir: PathBuf = match (&args.input_dir, &config.input_directory) {
        (Some(d), _) => PathBuf::from(d),
        (None, Some(d)) => base_dir.join(d),
        (None, None) if base_dir.as_os_str().is_empty() => PathBuf::from("."),
        (None, None) => base_dir.clone(),
    };
    let output_path: PathBuf = match (&args.out, &config.output_file) {
        (Some(o), _) => PathBuf::from(o),
        (None, Some(o)) => base_dir.join(o),
        (None, None) => input_dir.join(DEFAULT_OUTPUT_FILE),
    };

    let default_naming = PeriodNaming::default();
    let naming = PeriodNaming {
        prefix: args
            .prefix
            .clone()
            .or_else(|| config.file_prefix.clone())
            .unwrap_or(default_naming.prefix),
        suffix: args
            .suffix
            .clone()
            .or_else(|| config.file_suffix.clone())
            .unwrap_or(default_naming.suffix),
    };

    let mode = match args.mode {
        Some(ModeArg::Regenerate) => RunMode::Regenerate,
        Some(ModeArg::Update) | None => RunMode::Update,
    };

    Ok(TallySettings {
        input_dir,
        naming,
        columns: config.column_names(),
        output_path,
        worksheet_name: config.worksheet_name.clone(),
        sheet_title: config
            .sheet_title
            .clone()
            .unwrap_or_else(|| DEFAULT_SHEET_TITLE.to_string()),
        mode,
        json_out: args.json_out.clone(),
        reference: args.reference.clone(),
    })
}

/// Reads the summary of a previous run.
///
/// A missing file is not an error. A summary that cannot be read or lacks the
/// required columns is ignored with a warning: the run continues as if there was no
/// previous summary.
fn load_existing_summary(settings: &TallySettings) -> AccumulatedState {
    let path = settings.output_path.as_path();
    if !path.exists() {
        info!("No existing summary at {}", path.display());
        return AccumulatedState::new();
    }
    info!("Found existing summary {}, updating it", path.display());
    let sheet = match read_sheet(path, None) {
        Ok(sheet) => sheet,
        Err(e) => {
            warn!(
                "Error while reading the existing summary {}: {}. Starting from an empty summary",
                path.display(),
                describe_error(&e)
            );
            return AccumulatedState::new();
        }
    };
    match AccumulatedState::from_summary(&sheet, &settings.columns, &settings.naming) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "The existing summary {} cannot be used: {}. Starting from an empty summary",
                path.display(),
                e
            );
            AccumulatedState::new()
        }
    }
}

pub fn run_tally(settings: &TallySettings) -> TallyResult<RunOutcome> {
    info!("settings: {:?}", settings);
    let files = discover_period_files(
        &settings.input_dir,
        &settings.naming,
        &settings.output_path,
    )?;
    if files.is_empty() {
        info!(
            "No file matching {} found in {}",
            settings.naming.glob_pattern(),
            settings.input_dir.display()
        );
        return Ok(RunOutcome::NoInputFiles);
    }
    info!("Found files: {:?}", files);

    let mut state = match settings.mode {
        RunMode::Update => load_existing_summary(settings),
        RunMode::Regenerate => {
            info!("Regenerating the summary from scratch");
            AccumulatedState::new()
        }
    };

    let worksheet_name = settings.worksheet_name.as_deref();
    let report = ingest_periods(
        &mut state,
        files.as_slice(),
        &settings.naming,
        &settings.columns,
        |p: &Path| read_sheet(p, worksheet_name).map_err(|e| describe_error(&e)),
    );
    debug!("run_tally: report: {:?}", report);

    match report.outcome() {
        BatchOutcome::Updated => {}
        BatchOutcome::NothingToDo => {
            info!("No file could be read, nothing to write");
            return Ok(RunOutcome::Unchanged(BatchOutcome::NothingToDo));
        }
        BatchOutcome::NothingNew => {
            info!(
                "No new period to add, the summary {} is unchanged",
                settings.output_path.display()
            );
            return Ok(RunOutcome::Unchanged(BatchOutcome::NothingNew));
        }
    }

    let table = state.build_summary(&settings.columns);
    write_summary(&table, &settings.output_path, &settings.sheet_title)?;
    info!("Summary written to {}", settings.output_path.display());
    info!("- {} participants", table.rows.len());
    info!("- {} periods", table.periods.len());

    if let Some(json_out) = &settings.json_out {
        write_summary_json(&table, json_out)?;
    }
    if let Some(reference) = &settings.reference {
        check_reference(&table, reference)?;
    }

    Ok(RunOutcome::Written {
        participants: table.rows.len(),
        periods: table.periods.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "年级专业班级姓名,手机号码,学号,总分";

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn csv_settings(dir: &Path) -> TallySettings {
        TallySettings {
            input_dir: dir.to_path_buf(),
            naming: PeriodNaming {
                prefix: "S".to_string(),
                suffix: ".csv".to_string(),
            },
            columns: ColumnNames::default(),
            output_path: dir.join(DEFAULT_OUTPUT_FILE),
            worksheet_name: None,
            sheet_title: DEFAULT_SHEET_TITLE.to_string(),
            mode: RunMode::Update,
            json_out: None,
            reference: None,
        }
    }

    fn write_s1_s2(dir: &Path) {
        write_file(
            dir,
            "S1.csv",
            &format!("{}\nA,13800000000,100,50\nB,13800000001,101,30\n", HEADER),
        );
        write_file(
            dir,
            "S2.csv",
            &format!("{}\n,,101,40\nC,13800000002,102,10\n", HEADER),
        );
    }

    fn read_back(settings: &TallySettings) -> SummaryTable {
        let sheet = read_sheet(&settings.output_path, None).unwrap();
        AccumulatedState::from_summary(&sheet, &settings.columns, &settings.naming)
            .unwrap()
            .build_summary(&settings.columns)
    }

    fn labels(table: &SummaryTable) -> Vec<&str> {
        table.periods.iter().map(|p| p.as_str()).collect()
    }

    fn rows(table: &SummaryTable) -> Vec<(&str, Vec<f64>, f64)> {
        table
            .rows
            .iter()
            .map(|r| (r.participant.id.as_str(), r.scores.clone(), r.total))
            .collect()
    }

    #[test]
    fn builds_the_summary_from_csv_files() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let settings = csv_settings(temp.path());

        let outcome = run_tally(&settings).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Written {
                participants: 3,
                periods: 2
            }
        );

        let table = read_back(&settings);
        assert_eq!(labels(&table), vec!["S1", "S2"]);
        assert_eq!(
            rows(&table),
            vec![
                ("101", vec![30.0, 40.0], 70.0),
                ("100", vec![50.0, 0.0], 50.0),
                ("102", vec![0.0, 10.0], 10.0)
            ]
        );
        let b = &table.rows[0].participant;
        assert_eq!(b.display_name.as_deref(), Some("B"));
        assert_eq!(b.contact.as_deref(), Some("13800000001"));
    }

    #[test]
    fn second_update_run_leaves_the_summary_untouched() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let settings = csv_settings(temp.path());
        run_tally(&settings).unwrap();
        let before = fs::read(&settings.output_path).unwrap();

        let outcome = run_tally(&settings).unwrap();
        assert_eq!(outcome, RunOutcome::Unchanged(BatchOutcome::NothingNew));
        assert_eq!(fs::read(&settings.output_path).unwrap(), before);
    }

    #[test]
    fn update_run_appends_new_periods() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let settings = csv_settings(temp.path());
        run_tally(&settings).unwrap();

        // The old period files are gone, the summary keeps their scores.
        fs::remove_file(temp.path().join("S1.csv")).unwrap();
        fs::remove_file(temp.path().join("S2.csv")).unwrap();
        write_file(
            temp.path(),
            "S3.csv",
            &format!("{}\nA2,0,100,5\nD,13800000003,103,80\n", HEADER),
        );
        let outcome = run_tally(&settings).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Written {
                participants: 4,
                periods: 3
            }
        );

        let table = read_back(&settings);
        assert_eq!(labels(&table), vec!["S1", "S2", "S3"]);
        assert_eq!(
            rows(&table),
            vec![
                ("103", vec![0.0, 0.0, 80.0], 80.0),
                ("101", vec![30.0, 40.0, 0.0], 70.0),
                ("100", vec![50.0, 0.0, 5.0], 55.0),
                ("102", vec![0.0, 10.0, 0.0], 10.0)
            ]
        );
        let a = table.rows.iter().find(|r| r.participant.id == "100").unwrap();
        assert_eq!(a.participant.display_name.as_deref(), Some("A"));
    }

    #[test]
    fn regenerate_ignores_the_existing_summary() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let mut settings = csv_settings(temp.path());
        run_tally(&settings).unwrap();

        fs::remove_file(temp.path().join("S1.csv")).unwrap();
        settings.mode = RunMode::Regenerate;
        let outcome = run_tally(&settings).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Written {
                participants: 2,
                periods: 1
            }
        );
        let table = read_back(&settings);
        assert_eq!(labels(&table), vec!["S2"]);
        assert_eq!(
            rows(&table),
            vec![("101", vec![40.0], 40.0), ("102", vec![10.0], 10.0)]
        );
    }

    #[test]
    fn no_matching_file_writes_nothing() {
        init();
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "notes.csv", "a,b\n1,2\n");
        let settings = csv_settings(temp.path());
        assert_eq!(run_tally(&settings).unwrap(), RunOutcome::NoInputFiles);
        assert!(!settings.output_path.exists());
    }

    #[test]
    fn only_broken_files_write_nothing() {
        init();
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "S1.csv", "name,phone\nA,1\n");
        let settings = csv_settings(temp.path());
        assert_eq!(
            run_tally(&settings).unwrap(),
            RunOutcome::Unchanged(BatchOutcome::NothingToDo)
        );
        assert!(!settings.output_path.exists());
    }

    #[test]
    fn corrupt_files_are_skipped() {
        init();
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "S1.xlsx", "this is not a zip archive");
        write_file(
            temp.path(),
            "S1.csv",
            &format!("{}\nA,1,100,50\nshort,row\n,2,,10\n", HEADER),
        );
        let mut settings = csv_settings(temp.path());
        settings.naming.suffix = "".to_string();
        // Both files are matched: S1.csv has the label "S1.csv", S1.xlsx the label "S1.xlsx".
        let outcome = run_tally(&settings).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Written {
                participants: 1,
                periods: 1
            }
        );
        let table = read_back(&settings);
        assert_eq!(labels(&table), vec!["S1.csv"]);
    }

    #[test]
    fn unusable_existing_summary_is_rebuilt() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let settings = csv_settings(temp.path());
        write_file(temp.path(), DEFAULT_OUTPUT_FILE, "garbage");

        let outcome = run_tally(&settings).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Written {
                participants: 3,
                periods: 2
            }
        );
        assert_eq!(labels(&read_back(&settings)), vec!["S1", "S2"]);
    }

    #[test]
    fn summary_without_total_column_is_rebuilt() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let settings = csv_settings(temp.path());
        // A readable summary that lacks the total column.
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, name) in ["年级专业班级姓名", "手机号码", "学号", "S1", "S9"].iter().enumerate() {
            worksheet.write_string(0, col as u16, *name).unwrap();
        }
        worksheet.write_string(1, 0, "Old").unwrap();
        worksheet.write_string(1, 2, "100").unwrap();
        worksheet.write_number(1, 3, 99.0).unwrap();
        worksheet.write_number(1, 4, 7.0).unwrap();
        workbook.save(&settings.output_path).unwrap();

        let outcome = run_tally(&settings).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Written {
                participants: 3,
                periods: 2
            }
        );
        let table = read_back(&settings);
        assert_eq!(labels(&table), vec!["S1", "S2"]);
        let first = table.rows.iter().find(|r| r.participant.id == "100").unwrap();
        assert_eq!(first.participant.display_name.as_deref(), Some("A"));
        assert_eq!(first.total, 50.0);
    }

    #[test]
    fn summary_matching_the_naming_is_not_a_period() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let mut settings = csv_settings(temp.path());
        settings.naming.suffix = ".xlsx".to_string();
        settings.output_path = temp.path().join("Summary.xlsx");
        fs::remove_file(temp.path().join("S1.csv")).unwrap();
        fs::remove_file(temp.path().join("S2.csv")).unwrap();
        io_xlsx::tests::write_period_xlsx(
            &temp.path().join("S1.xlsx"),
            &[("A", "1", 100.0, 50.0)],
        );

        assert!(matches!(
            run_tally(&settings).unwrap(),
            RunOutcome::Written { .. }
        ));
        assert_eq!(
            run_tally(&settings).unwrap(),
            RunOutcome::Unchanged(BatchOutcome::NothingNew)
        );
    }

    #[test]
    fn json_export_matches_reference() {
        init();
        let temp = TempDir::new().unwrap();
        write_s1_s2(temp.path());
        let mut settings = csv_settings(temp.path());
        let json_path = temp.path().join("summary.json");
        settings.json_out = Some(json_path.display().to_string());
        run_tally(&settings).unwrap();

        let js: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(js["rows"][0]["id"], "101");
        assert_eq!(js["rows"][0]["total"], 70.0);
        assert_eq!(js["rows"][1]["scores"]["S2"], 0.0);

        // A regenerated summary from the same files matches the export.
        settings.mode = RunMode::Regenerate;
        settings.json_out = None;
        settings.reference = Some(json_path.display().to_string());
        assert!(run_tally(&settings).is_ok());

        // A different one does not.
        write_file(temp.path(), "S3.csv", &format!("{}\nZ,0,900,1\n", HEADER));
        let err = run_tally(&settings).unwrap_err();
        assert!(matches!(err, TallyError::ReferenceMismatch { .. }));
    }

    #[test]
    fn settings_merge_config_and_flags() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.json");
        write_file(
            temp.path(),
            "config.json",
            r#"{
                "inputDirectory": "sessions",
                "fileSuffix": ".csv",
                "outputFile": "out/total.xlsx",
                "columns": { "identifier": "ID", "total": "Total" }
            }"#,
        );
        let mut args = Args {
            config: Some(config_path.display().to_string()),
            input_dir: None,
            prefix: None,
            suffix: None,
            out: None,
            mode: None,
            json_out: None,
            reference: None,
            verbose: false,
        };
        let settings = settings_from_args(&args).unwrap();
        assert_eq!(settings.input_dir, temp.path().join("sessions"));
        assert_eq!(settings.output_path, temp.path().join("out/total.xlsx"));
        assert_eq!(settings.naming.prefix, "S");
        assert_eq!(settings.naming.suffix, ".csv");
        assert_eq!(settings.columns.identifier, "ID");
        assert_eq!(settings.columns.total, "Total");
        assert_eq!(settings.columns.score, ColumnNames::default().score);
        assert_eq!(settings.mode, RunMode::Update);

        args.input_dir = Some("elsewhere".to_string());
        args.suffix = Some(".xlsx".to_string());
        args.mode = Some(ModeArg::Regenerate);
        let settings = settings_from_args(&args).unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("elsewhere"));
        assert_eq!(settings.naming.suffix, ".xlsx");
        assert_eq!(settings.mode, RunMode::Regenerate);
    }

    #[test]
    fn default_settings_use_the_current_directory() {
        let args = Args {
            config: None,
            input_dir: None,
            prefix: None,
            suffix: None,
            out: None,
            mode: None,
            json_out: None,
            reference: None,
            verbose: false,
        };
        let settings = settings_from_args(&args).unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("."));
        assert_eq!(
            settings.output_path,
            PathBuf::from(".").join(DEFAULT_OUTPUT_FILE)
        );
        assert_eq!(settings.naming, PeriodNaming::default());
        assert_eq!(settings.sheet_title, DEFAULT_SHEET_TITLE);
    }
}
