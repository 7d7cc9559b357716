use crate::spreadsheet::reference::index_to_column;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use tracing::debug;

/// Resolves the target row of an operation.
///
/// A non-empty `search_key` wins over `explicit_row`: rows `1..=max_row` of
/// `key_column` are walked in physical order and the first cell whose trimmed
/// text equals `search_key` exactly is taken. The key itself is not trimmed
/// and no case folding is applied. Either way the row is bounds checked.
pub fn locate(
    sheet: &Sheet,
    explicit_row: usize,
    key_column: usize,
    search_key: Option<&str>,
) -> Result<usize, SpreadsheetError> {
    let row = match search_key.filter(|key| !key.is_empty()) {
        Some(key) => (1..=sheet.max_row())
            .find(|row| sheet.cell(*row, key_column).to_string().trim() == key)
            .ok_or_else(|| SpreadsheetError::SearchKeyNotFound {
                sheet: sheet.name().to_owned(),
                column: index_to_column(key_column),
                key: key.to_owned(),
            })?,
        None => explicit_row,
    };
    sheet.check_row(row)?;
    debug!(sheet = sheet.name(), row, "located row");
    Ok(row)
}
