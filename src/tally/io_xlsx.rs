use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::debug;
use score_ledger::{Cell, Sheet};
use snafu::prelude::*;

use std::path::Path;

use crate::tally::{EmptyExcelSnafu, MissingWorksheetSnafu, OpeningExcelSnafu, TallyResult};

/// Reads a worksheet of an Excel file. Without a worksheet name, the first worksheet is read.
///
/// The header is the first row of the worksheet and the rows start at the second one,
/// whatever the first non-empty cell is. Leading blank rows and columns are kept as
/// empty cells so that row and column positions match the worksheet.
pub fn read_xlsx_sheet(path: &Path, worksheet_name: Option<&str>) -> TallyResult<Sheet> {
    let wrange = get_range(path, worksheet_name)?;
    let (start_row, start_col) = match wrange.start() {
        Some((r, c)) => (r as usize, c as usize),
        None => return Ok(Sheet::default()),
    };
    let width = start_col + wrange.width();
    debug!(
        "read_xlsx_sheet: {} range starts at row {} column {}",
        path.display(),
        start_row,
        start_col
    );

    let mut grid: Vec<Vec<Cell>> = Vec::with_capacity(start_row + wrange.height());
    grid.resize_with(start_row, || vec![Cell::Empty; width]);
    for row in wrange.rows() {
        let mut cells: Vec<Cell> = vec![Cell::Empty; start_col];
        cells.extend(row.iter().map(to_cell));
        grid.push(cells);
    }

    let mut iter = grid.into_iter();
    let header: Vec<Option<String>> = match iter.next() {
        Some(row) => row.iter().map(header_name).collect(),
        None => Vec::new(),
    };
    debug!("read_xlsx_sheet: header: {:?}", header);
    let rows: Vec<Vec<Cell>> = iter.collect();
    Ok(Sheet { header, rows })
}

fn get_range(path: &Path, worksheet_name: Option<&str>) -> TallyResult<Range<DataType>> {
    let p = path.display().to_string();
    debug!("get_range: path: {:?} worksheet: {:?}", &p, worksheet_name);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: p.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(name) = worksheet_name {
        workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                path: p.clone(),
                name,
            })?
            .context(OpeningExcelSnafu { path: p })
    } else {
        workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: p.clone() })?
            .context(OpeningExcelSnafu { path: p })
    }
}

fn header_name(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Text(s) => Some(s.clone()),
        other => other.as_text(),
    }
}

fn to_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Bool(b) => Cell::Bool(*b),
        DataType::Empty => Cell::Empty,
        DataType::Error(e) => Cell::Text(format!("{:?}", e)),
        // Dates are kept as their serial number.
        other => Cell::Text(other.to_string()),
    }
}
