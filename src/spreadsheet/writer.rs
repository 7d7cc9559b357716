//! Single-cell edits of a worksheet part and atomic replacement of the package.
//!
//! The worksheet XML is streamed event by event: every event is copied
//! verbatim except at the target position, where the cell is replaced (or a
//! cell, and if needed a row, is inserted in order). Written values are stored
//! as inline strings; the cell keeps its original style index.

use crate::error::LoadoutError;
use crate::helpers::xml::XmlNameHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::fs;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use zip::ZipArchive;
use zip::ZipWriter;

const TAG_SHEET_DATA: &[u8] = b"sheetData";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_FORMULA: &[u8] = b"f";
const TAG_OVERRIDE: &[u8] = b"Override";
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// What to do with the event just read
enum Step {
    Copy,
    /// `<sheetData/>`: expand it and place a new row inside
    FillEmptySheetData,
    /// A row past the target, or `</sheetData>`: insert a new row before it
    InsertRowBefore,
    /// `<row/>` for the target row: expand it and place the cell inside
    FillEmptyRow,
    /// `<row>` for the target row
    EnterRow,
    /// A cell past the target column, or `</row>`: insert the cell before it
    InsertCellBefore,
    /// The target cell itself
    ReplaceCell { style: Option<String>, has_content: bool },
}

/// A worksheet part after a single-cell edit.
pub(crate) struct PatchedSheet {
    pub(crate) xml: Vec<u8>,
    /// The replaced cell held a formula
    pub(crate) removed_formula: bool,
}

/// Returns `xml` with the cell at `(row, col)` set to `value`.
///
/// An empty `value` leaves a bare `<c r=".." s=".."/>` element behind.
pub(crate) fn patch_cell(xml: &[u8], row: usize, col: usize, value: &str) -> Result<PatchedSheet, LoadoutError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));
    let reference = index_to_reference(row, col);

    let mut prefix = String::new();
    let mut in_sheet_data = false;
    let mut in_target_row = false;
    let mut current_row = 0usize;
    let mut current_col = 0usize;
    let mut skip_depth = 0usize;
    let mut removed_formula = false;
    let mut done = false;

    loop {
        let event = reader.read_event()?;
        if let Event::Eof = event {
            break;
        }
        if skip_depth > 0 {
            match &event {
                Event::Start(start) => {
                    removed_formula |= start.is_named(TAG_FORMULA);
                    skip_depth += 1;
                }
                Event::Empty(start) => removed_formula |= start.is_named(TAG_FORMULA),
                Event::End(_) => skip_depth -= 1,
                _ => (),
            }
            continue;
        }
        if done {
            writer.write_event(event)?;
            continue;
        }

        let step = match &event {
            Event::Start(start) | Event::Empty(start) if start.is_named(TAG_SHEET_DATA) => {
                prefix = start
                    .name()
                    .prefix()
                    .map(|prefix| format!("{}:", String::from_utf8_lossy(prefix.as_ref())))
                    .unwrap_or_default();
                in_sheet_data = true;
                if matches!(event, Event::Empty(_)) {
                    Step::FillEmptySheetData
                } else {
                    Step::Copy
                }
            }
            Event::End(end) if in_sheet_data && end.is_named(TAG_SHEET_DATA) => Step::InsertRowBefore,
            Event::Start(start) | Event::Empty(start)
                if in_sheet_data && !in_target_row && start.is_named(TAG_ROW) =>
            {
                current_row = start.parse_attribute_value::<usize>("r")?.unwrap_or(current_row + 1);
                current_col = 0;
                if current_row > row {
                    Step::InsertRowBefore
                } else if current_row < row {
                    Step::Copy
                } else if matches!(event, Event::Empty(_)) {
                    Step::FillEmptyRow
                } else {
                    Step::EnterRow
                }
            }
            Event::Start(start) | Event::Empty(start) if in_target_row && start.is_named(TAG_CELL) => {
                current_col = start
                    .get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .map(|(_, col)| col)
                    .unwrap_or(current_col + 1);
                if current_col > col {
                    Step::InsertCellBefore
                } else if current_col < col {
                    Step::Copy
                } else {
                    Step::ReplaceCell {
                        style: start.get_attribute_value("s")?.map(|style| style.into_owned()),
                        has_content: matches!(event, Event::Start(_)),
                    }
                }
            }
            Event::End(end) if in_target_row && end.is_named(TAG_ROW) => Step::InsertCellBefore,
            _ => Step::Copy,
        };

        match step {
            Step::Copy => writer.write_event(event)?,
            Step::EnterRow => {
                writer.write_event(event)?;
                in_target_row = true;
            }
            Step::InsertRowBefore => {
                write_row(&mut writer, &prefix, row, &reference, value)?;
                writer.write_event(event)?;
                done = true;
            }
            Step::InsertCellBefore => {
                write_cell(&mut writer, &prefix, &reference, None, value)?;
                writer.write_event(event)?;
                done = true;
            }
            Step::ReplaceCell { style, has_content } => {
                write_cell(&mut writer, &prefix, &reference, style.as_deref(), value)?;
                if has_content {
                    skip_depth = 1;
                }
                done = true;
            }
            Step::FillEmptySheetData | Step::FillEmptyRow => {
                if let Event::Empty(start) = event {
                    let end = start.to_end().into_owned();
                    let is_row = start.is_named(TAG_ROW);
                    writer.write_event(Event::Start(start))?;
                    if is_row {
                        write_cell(&mut writer, &prefix, &reference, None, value)?;
                    } else {
                        write_row(&mut writer, &prefix, row, &reference, value)?;
                    }
                    writer.write_event(Event::End(end))?;
                }
                done = true;
            }
        }
    }

    if !done {
        Err(SpreadsheetError::InvalidFormat {
            path: reference,
            reason: "worksheet has no sheetData element".to_owned(),
        })?;
    }
    Ok(PatchedSheet {
        xml: writer.into_inner(),
        removed_formula,
    })
}

fn write_row<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    row: usize,
    reference: &str,
    value: &str,
) -> Result<(), LoadoutError> {
    let name = format!("{prefix}row");
    let mut start = BytesStart::new(name.as_str());
    start.push_attribute(("r", row.to_string().as_str()));
    writer.write_event(Event::Start(start))?;
    write_cell(writer, prefix, reference, None, value)?;
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    reference: &str,
    style: Option<&str>,
    value: &str,
) -> Result<(), LoadoutError> {
    let cell = format!("{prefix}c");
    let mut start = BytesStart::new(cell.as_str());
    start.push_attribute(("r", reference));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }
    if value.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    start.push_attribute(("t", "inlineStr"));
    let inline = format!("{prefix}is");
    let text = format!("{prefix}t");
    let mut text_start = BytesStart::new(text.as_str());
    if value.trim() != value {
        text_start.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Start(BytesStart::new(inline.as_str())))?;
    writer.write_event(Event::Start(text_start))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(text.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(inline.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(cell.as_str())))?;
    Ok(())
}

/// Builds a copy of the package with `part` replaced by `replacement`.
///
/// With `drop_calc_chain` the calculation chain is removed together with its
/// content type override and workbook relationship. Excel rebuilds a missing
/// chain on load but asks to repair one that lists a cell without a formula.
pub(crate) fn rebuild_package<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    part: &str,
    replacement: &[u8],
    drop_calc_chain: bool,
) -> Result<Vec<u8>, LoadoutError> {
    let mut rewritten: Vec<(&str, Vec<u8>)> = Vec::new();
    let mut removals: Vec<&str> = Vec::new();
    if drop_calc_chain && zip.file_names().any(|name| name.eq_ignore_ascii_case(CALC_CHAIN_PART)) {
        if let Some(content_types) = zip.read_bytes(CONTENT_TYPES_PART)? {
            let stripped = strip_elements(&content_types, TAG_OVERRIDE, |start| {
                Ok(start
                    .get_attribute_value("PartName")?
                    .is_some_and(|name| name.trim_start_matches('/').eq_ignore_ascii_case(CALC_CHAIN_PART)))
            })?;
            rewritten.push((CONTENT_TYPES_PART, stripped));
        }
        if let Some(relationships) = zip.read_bytes(WORKBOOK_RELATIONSHIPS_PART)? {
            let stripped = strip_elements(&relationships, TAG_RELATIONSHIP, |start| {
                Ok(start
                    .get_attribute_value("Type")?
                    .is_some_and(|kind| kind.ends_with("/calcChain")))
            })?;
            rewritten.push((WORKBOOK_RELATIONSHIPS_PART, stripped));
        }
        removals.push(CALC_CHAIN_PART);
    }

    let mut replacements: Vec<(&str, &[u8])> = vec![(part, replacement)];
    replacements.extend(rewritten.iter().map(|(name, bytes)| (*name, bytes.as_slice())));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    zip.copy_with_changes(&mut writer, &replacements, &removals)?;
    Ok(writer.finish()?.into_inner())
}

/// Copies `xml`, leaving out every `tag` element (and its content) for which
/// `predicate` holds.
fn strip_elements(
    xml: &[u8],
    tag: &[u8],
    predicate: impl Fn(&BytesStart) -> Result<bool, LoadoutError>,
) -> Result<Vec<u8>, LoadoutError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if let Event::Eof = event {
            break;
        }
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => (),
            }
            continue;
        }
        let strip = match &event {
            Event::Start(start) | Event::Empty(start) if start.is_named(tag) => predicate(start)?,
            _ => false,
        };
        if !strip {
            writer.write_event(event)?;
        } else if let Event::Start(_) = event {
            skip_depth = 1;
        }
    }
    Ok(writer.into_inner())
}

/// Atomically replaces `path` with `bytes`.
///
/// The content goes to a temporary file in the same directory, which is then
/// renamed over the original. Readers see either the old or the new file.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), LoadoutError> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut temp = tempfile::Builder::new()
        .prefix(".loadout-")
        .suffix(".tmp")
        .tempfile_in(directory)?;
    temp.write_all(bytes)?;
    temp.as_file().set_permissions(permissions)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}
