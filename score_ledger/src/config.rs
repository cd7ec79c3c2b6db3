// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

/// The content of one spreadsheet cell, independent of the file format.
///
/// Readers map their own cell types onto this enumeration. Dates, errors and
/// other exotic cells are expected to be mapped to `Text` or `Empty`.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// The cell as a participant identifier.
    ///
    /// Text is trimmed. Integral numbers are rendered without a fractional part,
    /// so that an identifier stored as `2021001` in one file and as the text
    /// `"2021001"` in another is the same participant.
    pub fn as_identifier(&self) -> Option<String> {
        let s = match self {
            Cell::Empty => return None,
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(f) => format_number(*f),
            Cell::Bool(b) => b.to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    /// The cell as a free text attribute (name, contact).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(f) => Some(format_number(*f)),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }

    /// The cell as a score. Blank cells count as 0.
    ///
    /// Returns None if the cell holds something that is not a number.
    pub fn as_score(&self) -> Option<f64> {
        match self {
            Cell::Empty => Some(0.0),
            Cell::Number(f) if f.is_finite() => Some(*f),
            Cell::Number(_) => None,
            Cell::Text(s) if s.trim().is_empty() => Some(0.0),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Cell::Bool(_) => None,
        }
    }
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// A sheet as read from a file: the header (first row) and the data rows.
///
/// Rows are not required to have the same length as the header.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Sheet {
    pub header: Vec<Option<String>>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Builds a sheet from a header of plain strings.
    pub fn new(header: &[&str], rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet {
            header: header.iter().map(|s| Some(s.to_string())).collect(),
            rows,
        }
    }
}

/// The physical header names of the columns that the ledger needs.
///
/// The defaults are the headers used by the activity score sheets this tool
/// was written for. The score of a period file and the total of the summary
/// share the same header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnNames {
    pub name: String,
    pub contact: String,
    pub identifier: String,
    pub score: String,
    pub total: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            name: "年级专业班级姓名".to_string(),
            contact: "手机号码".to_string(),
            identifier: "学号".to_string(),
            score: "总分".to_string(),
            total: "总分".to_string(),
        }
    }
}

/// The label of one period (session), for example `S3`.
///
/// Labels are compared as plain strings: `S10` sorts before `S2`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct PeriodLabel(pub String);

impl PeriodLabel {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PeriodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How period files are named: `<prefix><token><suffix>`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PeriodNaming {
    pub prefix: String,
    pub suffix: String,
}

impl Default for PeriodNaming {
    fn default() -> Self {
        PeriodNaming {
            prefix: "S".to_string(),
            suffix: ".xlsx".to_string(),
        }
    }
}

impl PeriodNaming {
    /// The label of a period file, given its base name.
    ///
    /// ```
    /// use score_ledger::{PeriodLabel, PeriodNaming};
    /// let naming = PeriodNaming::default();
    /// assert_eq!(naming.label_for_file_name("S12.xlsx"), Some(PeriodLabel("S12".to_string())));
    /// assert_eq!(naming.label_for_file_name("summary.xlsx"), None);
    /// ```
    pub fn label_for_file_name(&self, file_name: &str) -> Option<PeriodLabel> {
        let token = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if token.is_empty() {
            None
        } else {
            Some(PeriodLabel(format!("{}{}", self.prefix, token)))
        }
    }

    /// True if a summary header names a period column.
    pub fn is_period_column(&self, header: &str) -> bool {
        header.len() > self.prefix.len() && header.starts_with(self.prefix.as_str())
    }

    /// The glob pattern matching the period files.
    pub fn glob_pattern(&self) -> String {
        format!("{}*{}", self.prefix, self.suffix)
    }
}

// ******** Model *********

/// A uniquely identified individual tracked across periods.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Participant {
    pub id: String,
    pub display_name: Option<String>,
    pub contact: Option<String>,
}

/// Shown in place of a missing display name.
pub const UNKNOWN_NAME: &str = "unknown";

impl Participant {
    pub fn display_name_or_unknown(&self) -> &str {
        self.display_name.as_deref().unwrap_or(UNKNOWN_NAME)
    }
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct SummaryRow {
    pub participant: Participant,
    /// One score per period of the table, in the same order.
    pub scores: Vec<f64>,
    pub total: f64,
}

/// The ranked summary: one row per participant, sorted by decreasing total.
#[derive(PartialEq, Debug, Clone)]
pub struct SummaryTable {
    pub columns: ColumnNames,
    pub periods: Vec<PeriodLabel>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// The header row: name, contact, identifier, the periods, total.
    pub fn header(&self) -> Vec<String> {
        let mut res = vec![
            self.columns.name.clone(),
            self.columns.contact.clone(),
            self.columns.identifier.clone(),
        ];
        res.extend(self.periods.iter().map(|p| p.0.clone()));
        res.push(self.columns.total.clone());
        res
    }
}

/// A problem with a single data row. The row is skipped, the rest of the file is kept.
///
/// Row numbers follow the spreadsheet convention: the header is row 1.
#[derive(PartialEq, Debug, Clone)]
pub enum RowIssue {
    Truncated { row: usize, width: usize, expected: usize },
    MissingIdentifier { row: usize },
    NonNumericScore { row: usize, content: String },
}

impl Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowIssue::Truncated {
                row,
                width,
                expected,
            } => write!(
                f,
                "row {} is incomplete ({} cells, expected at least {})",
                row, width, expected
            ),
            RowIssue::MissingIdentifier { row } => write!(f, "row {} has no identifier", row),
            RowIssue::NonNumericScore { row, content } => {
                write!(f, "row {} has a non-numeric score: {}", row, content)
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SkipReason {
    /// The file name does not follow the period naming.
    NotAPeriodFile,
    /// The period is already part of the accumulated state.
    AlreadyKnown(PeriodLabel),
    /// Another file of the same batch already provided this period.
    DuplicateInRun(PeriodLabel),
}

/// What happened to one candidate file.
#[derive(PartialEq, Debug, Clone)]
pub enum FileOutcome {
    Consumed {
        label: PeriodLabel,
        rows: usize,
        row_issues: Vec<RowIssue>,
        participants: usize,
    },
    Skipped(SkipReason),
    Rejected {
        label: PeriodLabel,
        missing: Vec<String>,
    },
    Failed {
        label: PeriodLabel,
        message: String,
    },
}

#[derive(PartialEq, Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BatchOutcome {
    /// At least one file was consumed: the summary must be written.
    Updated,
    /// No file was consumed and there was no prior state.
    NothingToDo,
    /// No file was consumed, the prior state is unchanged.
    NothingNew,
}

/// The result of ingesting a batch of period files.
#[derive(PartialEq, Debug, Clone)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub(crate) incoming_empty: bool,
}

impl BatchReport {
    /// The labels of the consumed files, in processing order.
    pub fn consumed(&self) -> Vec<PeriodLabel> {
        self.files
            .iter()
            .filter_map(|fr| match &fr.outcome {
                FileOutcome::Consumed { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn outcome(&self) -> BatchOutcome {
        if !self.consumed().is_empty() {
            BatchOutcome::Updated
        } else if self.incoming_empty {
            BatchOutcome::NothingToDo
        } else {
            BatchOutcome::NothingNew
        }
    }
}

/// Errors that prevent a whole sheet from being used.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum LedgerError {
    /// Some required columns are not in the header. Holds the missing header names.
    MissingColumns { missing: Vec<String> },
    /// The sheet has no header row.
    EmptySheet,
}

impl Error for LedgerError {}

impl Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::MissingColumns { missing } => {
                write!(f, "missing required columns: {:?}", missing)
            }
            LedgerError::EmptySheet => write!(f, "the sheet has no header row"),
        }
    }
}
