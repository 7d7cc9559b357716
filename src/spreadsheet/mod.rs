//! # Spreadsheet Access Module
//!
//! Opens Office Open XML workbooks (`.xlsx`, `.xlsm`), exposes their sheets as
//! in-memory grids and writes single cells back to the package atomically.
//!
//! A [`Workbook`] is a transient, exclusively owned handle: it is created for
//! one operation and dropped before the operation returns. The backing file is
//! read into memory when the workbook is opened, so no OS file handle outlives
//! [`Workbook::open`].
use thiserror::Error;

pub mod cell;
pub mod reference;
pub mod sheet;
pub mod workbook;
pub(crate) mod writer;

pub use cell::CellValue;
pub use cell::ValueType;
pub use reference::ColumnBand;
pub use sheet::RowRecord;
pub use sheet::Sheet;
pub use workbook::Workbook;

/// Failures raised while opening, reading or editing a workbook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetError {
    /// The resolved file does not exist
    #[error("Spreadsheet file not found: '{path}'")]
    FileNotFound { path: String },

    /// The file extension or content is not a supported workbook
    #[error("Invalid spreadsheet format for '{path}': {reason}")]
    InvalidFormat { path: String, reason: String },

    /// The workbook has no sheet with the requested name
    #[error("Sheet '{sheet}' not found in '{path}'")]
    SheetNotFound { path: String, sheet: String },

    /// Row outside `1..=max_row`
    #[error("Row {row} is out of range in sheet '{sheet}': the sheet has {max_row} rows")]
    RowOutOfRange { sheet: String, row: usize, max_row: usize },

    /// Column outside the permitted band
    #[error("Column '{column}' is out of the allowed range {allowed}")]
    ColumnOutOfRange { column: String, allowed: String },

    /// Linear search over the key column found nothing
    #[error("Search key '{key}' not found in column {column} of sheet '{sheet}'")]
    SearchKeyNotFound { sheet: String, column: String, key: String },

    /// Malformed column band such as `F:A`
    #[error("Invalid column range '{0}'")]
    InvalidColumnBand(String),
}
