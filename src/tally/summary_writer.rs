use log::debug;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use score_ledger::SummaryTable;
use snafu::prelude::*;

use std::fs;
use std::path::{Path, PathBuf};

use crate::tally::{RenamingSummarySnafu, TallyResult, WritingSummarySnafu};

// Widths of the name, contact and identifier columns. The other columns use the default width.
const IDENTITY_WIDTHS: [f64; 3] = [30.0, 15.0, 15.0];
const DEFAULT_WIDTH: f64 = 12.0;

/// The cell formats of the summary. They only change the look of the file.
struct SummaryStyles {
    header: Format,
    identity: Format,
    period: Format,
    // A zero score marks a period in which the participant did not take part.
    zero: Format,
    total: Format,
}

impl SummaryStyles {
    fn new() -> SummaryStyles {
        let base = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::Black);
        let centered = base
            .clone()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        SummaryStyles {
            header: centered
                .clone()
                .set_bold()
                .set_background_color(Color::RGB(0xB0C4DE)),
            identity: base,
            period: centered.clone().set_background_color(Color::RGB(0xD5E8D4)),
            zero: centered.clone().set_background_color(Color::RGB(0xFFCCCC)),
            total: centered
                .set_bold()
                .set_background_color(Color::RGB(0xFFD700)),
        }
    }
}

/// Writes the summary as an Excel file, replacing any previous file.
///
/// The workbook is first saved next to the destination, then moved over it, so that
/// a failed write leaves the previous summary in place.
pub fn write_summary(table: &SummaryTable, path: &Path, sheet_title: &str) -> TallyResult<()> {
    let p = path.display().to_string();
    let mut workbook = Workbook::new();
    fill_workbook(&mut workbook, table, sheet_title)
        .context(WritingSummarySnafu { path: p.clone() })?;

    let partial = partial_path(path);
    debug!("write_summary: saving to {:?}", partial);
    workbook
        .save(&partial)
        .context(WritingSummarySnafu { path: p.clone() })?;
    fs::rename(&partial, path).context(RenamingSummarySnafu {
        from: partial.display().to_string(),
        path: p,
    })?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", file_name))
}

fn fill_workbook(
    workbook: &mut Workbook,
    table: &SummaryTable,
    sheet_title: &str,
) -> Result<(), XlsxError> {
    let styles = SummaryStyles::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_title)?;

    let header = table.header();
    for (col, name) in header.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, name.as_str(), &styles.header)?;
        let width = IDENTITY_WIDTHS
            .get(col as usize)
            .cloned()
            .unwrap_or(DEFAULT_WIDTH);
        worksheet.set_column_width(col, width)?;
    }

    let total_col = (3 + table.periods.len()) as u16;
    for (idx, row) in table.rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        let p = &row.participant;
        worksheet.write_string_with_format(r, 0, p.display_name_or_unknown(), &styles.identity)?;
        match &p.contact {
            Some(contact) => {
                worksheet.write_string_with_format(r, 1, contact.as_str(), &styles.identity)?;
            }
            None => {
                worksheet.write_blank(r, 1, &styles.identity)?;
            }
        }
        worksheet.write_string_with_format(r, 2, p.id.as_str(), &styles.identity)?;
        for (pidx, score) in row.scores.iter().enumerate() {
            let format = if *score == 0.0 {
                &styles.zero
            } else {
                &styles.period
            };
            worksheet.write_number_with_format(r, (3 + pidx) as u16, *score, format)?;
        }
        worksheet.write_number_with_format(r, total_col, row.total, &styles.total)?;
    }

    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}
