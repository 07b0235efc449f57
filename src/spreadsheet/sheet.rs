use crate::spreadsheet::cell::Cell;
use crate::table::RawTable;
use crate::table::Value;
use log::debug;
use std::collections::BTreeMap;

/// Cells collected from one worksheet, before header detection.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells in reading order
    pub(crate) cells: Vec<Cell>,
}

impl Sheet {
    pub(super) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Turns the sheet into a raw table.
    ///
    /// The first row holding any value is the header and rows above it are
    /// dropped. Entirely empty rows are skipped. The table spans the columns
    /// between the leftmost and the rightmost non-empty cell. A sheet without
    /// values yields `None`.
    pub(crate) fn into_raw_table(self) -> Option<RawTable> {
        let values = self
            .cells
            .iter()
            .map(|cell| (cell.row, cell.col, cell.to_value()))
            .filter(|(_, _, value)| !value.is_empty())
            .collect::<Vec<_>>();
        let col_lower = values.iter().map(|(_, col, _)| *col).min()?;
        let col_upper = values.iter().map(|(_, col, _)| *col).max()?;
        let width = col_upper - col_lower + 1;

        let mut rows = BTreeMap::<usize, Vec<Value>>::new();
        for (row, col, value) in values {
            rows.entry(row).or_insert_with(|| vec![Value::Empty; width])[col - col_lower] = value;
        }

        let mut rows = rows.into_values();
        let header = rows
            .next()?
            .into_iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>();
        let data = rows.collect::<Vec<_>>();
        debug!(
            "Sheet '{}' of {}: {} column(s), {} data row(s)",
            self.name,
            self.file_name,
            header.len(),
            data.len()
        );
        Some(RawTable::new(format!("{}#{}", self.file_name, self.name), header, data))
    }
}
