use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::index_to_column;
use crate::spreadsheet::reference::ColumnBand;
use crate::spreadsheet::SpreadsheetError;
use std::collections::BTreeMap;

static EMPTY: CellValue = CellValue::Empty;

/// A named grid of cells loaded from one worksheet.
///
/// Only populated cells are stored; everything else reads as [`CellValue::Empty`].
/// Keys are `(row, col)`, both 1-based, so iteration follows physical row order.
#[derive(Clone, Debug)]
pub struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    cells: BTreeMap<(usize, usize), CellValue>,
    /// Highest row holding a cell element (styled empty cells included)
    row_upper_bound: usize,
    /// Highest column holding a cell element
    col_upper_bound: usize,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: BTreeMap::new(),
            row_upper_bound: 0,
            col_upper_bound: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last populated row. A sheet without cells still reports row 1.
    pub fn max_row(&self) -> usize {
        self.row_upper_bound.max(1)
    }

    /// Last populated column. A sheet without cells still reports column 1.
    pub fn max_col(&self) -> usize {
        self.col_upper_bound.max(1)
    }

    /// Records that a cell element exists at `(row, col)` even if it holds no value.
    pub(crate) fn touch(&mut self, row: usize, col: usize) {
        self.row_upper_bound = self.row_upper_bound.max(row);
        self.col_upper_bound = self.col_upper_bound.max(col);
    }

    /// Stores a value, extending the bounds as needed. Empty values clear the cell.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: CellValue) {
        self.touch(row, col);
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    /// The value at `(row, col)`; missing cells are empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    /// Fails with `RowOutOfRange` unless `1 <= row <= max_row`.
    pub fn check_row(&self, row: usize) -> Result<(), SpreadsheetError> {
        if row < 1 || row > self.max_row() {
            return Err(SpreadsheetError::RowOutOfRange {
                sheet: self.name.to_owned(),
                row,
                max_row: self.max_row(),
            });
        }
        Ok(())
    }

    /// Reads one row across `band`. The record always holds `band.len()` values.
    pub fn read_row(&self, row: usize, band: ColumnBand) -> Result<RowRecord, SpreadsheetError> {
        self.check_row(row)?;
        let values = band
            .columns()
            .map(|col| self.cell(row, col).clone())
            .collect();
        Ok(RowRecord { row, band, values })
    }

    /// Lazily yields the stringified non-empty cells of `col` from `start_row`
    /// to the last populated row, skipping empty cells.
    pub fn read_column(&self, col: usize, start_row: usize) -> impl Iterator<Item = String> + '_ {
        (start_row.max(1)..=self.row_upper_bound)
            .filter_map(move |row| self.cells.get(&(row, col)))
            .map(|value| value.to_string())
    }
}

/// One row's values across a column band.
#[derive(Clone, Debug, PartialEq)]
pub struct RowRecord {
    pub row: usize,
    pub band: ColumnBand,
    pub values: Vec<CellValue>,
}

impl RowRecord {
    /// Value at a zero-based offset into the band, normalized to a string.
    pub fn text(&self, offset: usize) -> String {
        self.values.get(offset).map(|value| value.to_string()).unwrap_or_default()
    }

    /// Renders `%A: <value> %B: <value> ... %`.
    ///
    /// An empty value renders as `%C: ` with no padding, so a blank column
    /// shows up as `%C: %`.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        for (col, value) in self.band.columns().zip(&self.values) {
            summary.push('%');
            summary.push_str(&index_to_column(col));
            summary.push_str(": ");
            if !value.is_empty() {
                summary.push_str(&value.to_string());
                summary.push(' ');
            }
        }
        summary.push('%');
        summary
    }

    /// Renders `A2: <value>, B2: <value>, ...` for the whole band.
    pub fn listing(&self) -> String {
        self.band
            .columns()
            .zip(&self.values)
            .map(|(col, value)| format!("{}{}: {}", index_to_column(col), self.row, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
