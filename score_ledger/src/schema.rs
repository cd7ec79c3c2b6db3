use log::debug;
use std::collections::HashMap;

use crate::config::*;

/// A column the ledger needs, independent of its physical header name.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RequiredColumn {
    Name,
    Contact,
    Identifier,
    Score,
    Total,
}

impl RequiredColumn {
    /// Columns of a period file.
    pub const PERIOD_FILE: [RequiredColumn; 4] = [
        RequiredColumn::Name,
        RequiredColumn::Contact,
        RequiredColumn::Identifier,
        RequiredColumn::Score,
    ];

    /// Columns of a summary file.
    pub const SUMMARY_FILE: [RequiredColumn; 4] = [
        RequiredColumn::Name,
        RequiredColumn::Contact,
        RequiredColumn::Identifier,
        RequiredColumn::Total,
    ];

    pub fn header_name(self, columns: &ColumnNames) -> &str {
        match self {
            RequiredColumn::Name => columns.name.as_str(),
            RequiredColumn::Contact => columns.contact.as_str(),
            RequiredColumn::Identifier => columns.identifier.as_str(),
            RequiredColumn::Score => columns.score.as_str(),
            RequiredColumn::Total => columns.total.as_str(),
        }
    }
}

/// The required columns of one sheet, resolved to their positions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchemaBinding {
    indexes: Vec<(RequiredColumn, usize)>,
}

impl SchemaBinding {
    /// Finds every required column in the header, by exact name.
    ///
    /// All the missing columns are reported at once. When a header name appears
    /// several times, the first occurrence is used.
    pub fn resolve(
        required: &[RequiredColumn],
        columns: &ColumnNames,
        header: &[Option<String>],
    ) -> Result<SchemaBinding, LedgerError> {
        if header.is_empty() {
            return Err(LedgerError::EmptySheet);
        }
        let mut col_names: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            if let Some(s) = name {
                col_names.entry(s.as_str()).or_insert(idx);
            }
        }
        debug!("SchemaBinding::resolve: col_names: {:?}", col_names);

        let mut indexes: Vec<(RequiredColumn, usize)> = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for rc in required {
            let cname = rc.header_name(columns);
            match col_names.get(cname) {
                Some(idx) => indexes.push((*rc, *idx)),
                None => missing.push(cname.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(LedgerError::MissingColumns { missing });
        }
        Ok(SchemaBinding { indexes })
    }

    pub fn index(&self, column: RequiredColumn) -> Option<usize> {
        self.indexes
            .iter()
            .find(|(rc, _)| *rc == column)
            .map(|(_, idx)| *idx)
    }

    /// The number of cells a row needs to contain every bound column.
    pub fn min_width(&self) -> usize {
        self.indexes.iter().map(|(_, idx)| idx + 1).max().unwrap_or(0)
    }

    /// True if the position is one of the bound columns.
    pub fn binds(&self, idx: usize) -> bool {
        self.indexes.iter().any(|(_, i)| *i == idx)
    }

    /// The cell of a bound column. The row must be at least `min_width()` long.
    pub(crate) fn cell<'a>(&self, row: &'a [Cell], column: RequiredColumn) -> &'a Cell {
        match self.index(column).and_then(|idx| row.get(idx)) {
            Some(c) => c,
            None => &Cell::Empty,
        }
    }
}
