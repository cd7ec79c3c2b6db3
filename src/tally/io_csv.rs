// Primitives for reading CSV files.

use log::debug;
use score_ledger::{Cell, Sheet};
use snafu::prelude::*;

use std::path::Path;

use crate::tally::{CsvLineParseSnafu, CsvOpenSnafu, TallyResult};

/// Reads a CSV file: the first record is the header, the other ones are the rows.
///
/// Records may have any number of fields. All the values are read as text.
pub fn read_csv_sheet(path: &Path) -> TallyResult<Sheet> {
    let p = path.display().to_string();
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path: p.clone() })?;
    let mut records = rdr.into_records();

    let header: Vec<Option<String>> = match records.next() {
        Some(line_r) => {
            let line = line_r.context(CsvLineParseSnafu {
                path: p.clone(),
                lineno: 1usize,
            })?;
            line.iter()
                .enumerate()
                .map(|(idx, s)| {
                    // Excel writes a byte order mark at the start of UTF-8 files.
                    let s = if idx == 0 {
                        s.trim_start_matches('\u{feff}')
                    } else {
                        s
                    };
                    if s.is_empty() {
                        None
                    } else {
                        Some(s.to_string())
                    }
                })
                .collect()
        }
        None => Vec::new(),
    };
    debug!("read_csv_sheet: {} header: {:?}", p, header);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {
            path: p.clone(),
            lineno,
        })?;
        debug!("read_csv_sheet: {:?} {:?}", lineno, line);
        rows.push(line.iter().map(parse_field).collect());
    }
    Ok(Sheet { header, rows })
}

fn parse_field(s: &str) -> Cell {
    if s.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_ragged_rows() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("S1.csv");
        fs::write(&path, "\u{feff}name,phone,id,score\nA,1,100,50\nB,2\n\"C, jr\",,102,\n").unwrap();
        let sheet = read_csv_sheet(&path).unwrap();
        assert_eq!(
            sheet.header,
            vec![
                Some("name".to_string()),
                Some("phone".to_string()),
                Some("id".to_string()),
                Some("score".to_string())
            ]
        );
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1], vec![Cell::Text("B".to_string()), Cell::Text("2".to_string())]);
        assert_eq!(
            sheet.rows[2],
            vec![
                Cell::Text("C, jr".to_string()),
                Cell::Empty,
                Cell::Text("102".to_string()),
                Cell::Empty
            ]
        );
    }

    #[test]
    fn empty_file_has_no_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("S1.csv");
        fs::write(&path, "").unwrap();
        assert_eq!(read_csv_sheet(&path).unwrap(), Sheet::default());
    }
}
