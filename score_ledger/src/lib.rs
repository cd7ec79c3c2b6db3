/*!
Merges per-period participation score sheets into one cumulative ledger.

Each period (session) of an activity produces one sheet, keyed by a participant
identifier. The ledger folds these sheets into an [`AccumulatedState`]: one record
per participant, with one score per period. The state can be rebuilt from a
previously written summary, so that only new periods need to be read on later runs.

```
use score_ledger::*;

let columns = ColumnNames::default();
let header = ["年级专业班级姓名", "手机号码", "学号", "总分"];
let s1 = Sheet::new(&header, vec![
    vec![Cell::Text("Anna".to_string()), Cell::Empty, Cell::Number(100.0), Cell::Number(50.0)],
]);

let mut state = AccumulatedState::new();
let report = ingest_periods(
    &mut state,
    &["S1.xlsx"],
    &PeriodNaming::default(),
    &columns,
    |_| Ok::<Sheet, String>(s1.clone()),
);
assert_eq!(report.outcome(), BatchOutcome::Updated);

let table = state.build_summary(&columns);
assert_eq!(table.rows[0].participant.id, "100");
assert_eq!(table.rows[0].total, 50.0);
```
*/

pub mod builder;
mod config;
pub mod manual;
mod schema;

use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::Path;

pub use crate::config::*;
pub use crate::schema::{RequiredColumn, SchemaBinding};

/// A participant and its scores, one per period in which it appeared.
#[derive(PartialEq, Debug, Clone)]
pub struct ParticipantRecord {
    pub participant: Participant,
    pub scores: BTreeMap<PeriodLabel, f64>,
}

impl ParticipantRecord {
    fn new(participant: Participant) -> ParticipantRecord {
        ParticipantRecord {
            participant,
            scores: BTreeMap::new(),
        }
    }

    /// The score for a period, 0 if the participant did not take part.
    pub fn score(&self, period: &PeriodLabel) -> f64 {
        self.scores.get(period).cloned().unwrap_or(0.0)
    }
}

/// The result of folding one period sheet into the state.
#[derive(PartialEq, Debug, Clone)]
pub struct PeriodIngest {
    pub rows: usize,
    pub row_issues: Vec<RowIssue>,
}

/// All the periods and participants seen so far.
///
/// Invariants:
/// - every period that appears in a score mapping is a known period
/// - there is one record per identifier
/// - periods are only ever added
#[derive(PartialEq, Debug, Clone, Default)]
pub struct AccumulatedState {
    periods: BTreeSet<PeriodLabel>,
    participants: BTreeMap<String, ParticipantRecord>,
}

impl AccumulatedState {
    pub fn new() -> AccumulatedState {
        AccumulatedState::default()
    }

    /// Rebuilds the state from a previously written summary sheet.
    ///
    /// The summary must contain the name, contact, identifier and total columns.
    /// Every other column whose header follows the period naming is a period column.
    /// The totals are not read back: they are recomputed from the periods.
    pub fn from_summary(
        sheet: &Sheet,
        columns: &ColumnNames,
        naming: &PeriodNaming,
    ) -> Result<AccumulatedState, LedgerError> {
        let binding = SchemaBinding::resolve(&RequiredColumn::SUMMARY_FILE, columns, &sheet.header)?;
        let fixed_names: Vec<&str> = RequiredColumn::SUMMARY_FILE
            .iter()
            .map(|rc| rc.header_name(columns))
            .collect();
        let period_columns: Vec<(usize, PeriodLabel)> = sheet
            .header
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| match h {
                Some(s)
                    if !binding.binds(idx)
                        && !fixed_names.contains(&s.as_str())
                        && naming.is_period_column(s) =>
                {
                    Some((idx, PeriodLabel(s.clone())))
                }
                _ => None,
            })
            .collect();
        debug!("from_summary: period columns: {:?}", period_columns);

        let mut state = AccumulatedState::new();
        for (_, label) in period_columns.iter() {
            state.periods.insert(label.clone());
        }

        for (idx, row) in sheet.rows.iter().enumerate() {
            let lineno = idx + 2;
            if row.len() < binding.min_width() {
                warn!("Summary row {} is incomplete, skipped", lineno);
                continue;
            }
            let id = match binding.cell(row, RequiredColumn::Identifier).as_identifier() {
                Some(id) => id,
                None => {
                    warn!("Summary row {} has no identifier, skipped", lineno);
                    continue;
                }
            };
            if state.participants.contains_key(&id) {
                warn!(
                    "Summary row {}: identifier {} appears more than once, keeping the first row",
                    lineno, id
                );
                continue;
            }
            let mut record = ParticipantRecord::new(participant_from_row(&binding, row, id));
            for (col_idx, label) in period_columns.iter() {
                if let Some(cell) = row.get(*col_idx) {
                    match cell.as_score() {
                        Some(score) => {
                            record.scores.insert(label.clone(), score);
                        }
                        None => warn!(
                            "Summary row {}: score {:?} for period {} is not a number, counted as 0",
                            lineno, cell, label
                        ),
                    }
                }
            }
            state
                .participants
                .insert(record.participant.id.clone(), record);
        }
        info!(
            "Loaded summary with {} participants and {} periods",
            state.participants.len(),
            state.periods.len()
        );
        Ok(state)
    }

    /// True if there is neither a participant nor a period.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.periods.is_empty()
    }

    pub fn knows_period(&self, label: &PeriodLabel) -> bool {
        self.periods.contains(label)
    }

    /// The known periods, in ascending order.
    pub fn periods(&self) -> impl Iterator<Item = &PeriodLabel> {
        self.periods.iter()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn record(&self, id: &str) -> Option<&ParticipantRecord> {
        self.participants.get(id)
    }

    /// The records, ordered by identifier.
    pub fn records(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.participants.values()
    }

    /// Sets the score of a participant for a period.
    ///
    /// The participant is created if it is new. The identity of a known participant is
    /// left untouched: the first values seen for an identifier are kept.
    pub(crate) fn add_score(&mut self, participant: Participant, label: &PeriodLabel, score: f64) {
        self.periods.insert(label.clone());
        let record = self
            .participants
            .entry(participant.id.clone())
            .or_insert_with(|| ParticipantRecord::new(participant));
        record.scores.insert(label.clone(), score);
    }

    /// Folds the rows of a period sheet into the state.
    ///
    /// The sheet is rejected as a whole if a required column is missing. Otherwise
    /// the invalid rows are skipped and reported, and the period becomes known, even
    /// if no row was valid.
    pub fn absorb_period(
        &mut self,
        label: &PeriodLabel,
        sheet: &Sheet,
        columns: &ColumnNames,
    ) -> Result<PeriodIngest, LedgerError> {
        let binding = SchemaBinding::resolve(&RequiredColumn::PERIOD_FILE, columns, &sheet.header)?;
        let width = binding.min_width();
        debug!("absorb_period: {} binding: {:?}", label, binding);

        let mut rows = 0;
        let mut row_issues: Vec<RowIssue> = Vec::new();
        for (idx, row) in sheet.rows.iter().enumerate() {
            let lineno = idx + 2;
            if row.len() < width {
                row_issues.push(RowIssue::Truncated {
                    row: lineno,
                    width: row.len(),
                    expected: width,
                });
                continue;
            }
            let id = match binding.cell(row, RequiredColumn::Identifier).as_identifier() {
                Some(id) => id,
                None => {
                    row_issues.push(RowIssue::MissingIdentifier { row: lineno });
                    continue;
                }
            };
            let score_cell = binding.cell(row, RequiredColumn::Score);
            let score = match score_cell.as_score() {
                Some(s) => s,
                None => {
                    row_issues.push(RowIssue::NonNumericScore {
                        row: lineno,
                        content: format!("{:?}", score_cell),
                    });
                    continue;
                }
            };
            debug!("absorb_period: {} row {}: {} -> {}", label, lineno, id, score);
            self.add_score(participant_from_row(&binding, row, id), label, score);
            rows += 1;
        }
        self.periods.insert(label.clone());
        Ok(PeriodIngest { rows, row_issues })
    }

    /// The ranked summary of the state.
    ///
    /// Rows are sorted by decreasing total. Participants with the same total stay
    /// in ascending identifier order.
    pub fn build_summary(&self, columns: &ColumnNames) -> SummaryTable {
        let periods: Vec<PeriodLabel> = self.periods.iter().cloned().collect();
        let mut rows: Vec<SummaryRow> = self
            .participants
            .values()
            .map(|record| {
                let scores: Vec<f64> = periods.iter().map(|p| record.score(p)).collect();
                let total: f64 = scores.iter().sum();
                SummaryRow {
                    participant: record.participant.clone(),
                    scores,
                    total,
                }
            })
            .collect();
        // sort_by is stable
        rows.sort_by(|a, b| b.total.total_cmp(&a.total));
        SummaryTable {
            columns: columns.clone(),
            periods,
            rows,
        }
    }
}

fn participant_from_row(binding: &SchemaBinding, row: &[Cell], id: String) -> Participant {
    Participant {
        id,
        display_name: binding.cell(row, RequiredColumn::Name).as_text(),
        contact: binding.cell(row, RequiredColumn::Contact).as_text(),
    }
}

/// Reads a batch of period files into the state.
///
/// Arguments:
/// * `state` the state to extend. It is empty in regenerate mode, or loaded from the
/// existing summary in update mode.
/// * `files` the candidate files, processed in order
/// * `read_sheet` reads one file. A failure only skips that file.
///
/// Periods already in `state` are skipped, which makes repeated runs idempotent.
/// When two files of the batch map to the same period, the first file that is consumed
/// wins and the later ones are skipped. A file that cannot be read or is rejected does
/// not claim its period.
pub fn ingest_periods<P, F, E>(
    state: &mut AccumulatedState,
    files: &[P],
    naming: &PeriodNaming,
    columns: &ColumnNames,
    mut read_sheet: F,
) -> BatchReport
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> Result<Sheet, E>,
    E: Display,
{
    let incoming_empty = state.is_empty();
    let known_before: BTreeSet<PeriodLabel> = state.periods.clone();
    let mut reports: Vec<FileReport> = Vec::new();
    for p in files {
        let path = p.as_ref();
        let outcome = ingest_file(state, path, &known_before, naming, columns, &mut read_sheet);
        reports.push(FileReport {
            path: path.to_path_buf(),
            outcome,
        });
    }
    BatchReport {
        files: reports,
        incoming_empty,
    }
}

fn ingest_file<F, E>(
    state: &mut AccumulatedState,
    path: &Path,
    known_before: &BTreeSet<PeriodLabel>,
    naming: &PeriodNaming,
    columns: &ColumnNames,
    read_sheet: &mut F,
) -> FileOutcome
where
    F: FnMut(&Path) -> Result<Sheet, E>,
    E: Display,
{
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let label = match naming.label_for_file_name(file_name) {
        Some(l) => l,
        None => {
            warn!("File {} does not name a period, skipped", path.display());
            return FileOutcome::Skipped(SkipReason::NotAPeriodFile);
        }
    };
    if known_before.contains(&label) {
        info!(
            "Period {} is already in the summary, skipping file {}",
            label,
            path.display()
        );
        return FileOutcome::Skipped(SkipReason::AlreadyKnown(label));
    }
    if state.knows_period(&label) {
        warn!(
            "Period {} was already read from another file, skipping file {}",
            label,
            path.display()
        );
        return FileOutcome::Skipped(SkipReason::DuplicateInRun(label));
    }

    let sheet = match read_sheet(path) {
        Ok(sheet) => sheet,
        Err(e) => {
            warn!("Error while reading file {}: {}", path.display(), e);
            return FileOutcome::Failed {
                label,
                message: e.to_string(),
            };
        }
    };

    match state.absorb_period(&label, &sheet, columns) {
        Ok(ingest) => {
            for issue in ingest.row_issues.iter() {
                warn!("File {}: {}, skipped", path.display(), issue);
            }
            info!(
                "Read file {} ({} rows), the summary now has {} participants",
                path.display(),
                ingest.rows,
                state.participant_count()
            );
            FileOutcome::Consumed {
                label,
                rows: ingest.rows,
                row_issues: ingest.row_issues,
                participants: state.participant_count(),
            }
        }
        Err(LedgerError::MissingColumns { missing }) => {
            warn!(
                "File {} is missing the required columns {:?}, skipped",
                path.display(),
                missing
            );
            FileOutcome::Rejected { label, missing }
        }
        Err(e) => {
            warn!("File {} cannot be used: {}", path.display(), e);
            FileOutcome::Failed {
                label,
                message: e.to_string(),
            }
        }
    }
}
