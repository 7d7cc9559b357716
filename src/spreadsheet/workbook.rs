use crate::error::LoadoutError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNameHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::index_to_column;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::ColumnBand;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::writer;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io::BufRead;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use zip::ZipArchive;

// XML tag names (local names) used in the workbook package
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts"; // Custom number formats container
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt"; // Individual custom number format
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs"; // Cell format indexes container
const TAG_FORMAT_INDEX: &[u8] = b"xf"; // Individual cell format index
const TAG_SHARED_STRING_ITEM: &[u8] = b"si"; // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh"; // Phonetic text for Asian languages
const TAG_TEXT: &[u8] = b"t"; // Text content within strings
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const TAG_SHEET: &[u8] = b"sheet";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

type Package = ZipArchive<Cursor<Vec<u8>>>;

/// An opened workbook package.
pub struct Workbook {
    /// Absolute location of the backing file
    path: PathBuf,
    /// ZIP archive holding the package parts
    zip: Package,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Cell types indexed by style id, for date detection
    number_formats: Vec<CellType>,
    /// Whether the workbook uses the 1904 date system
    is_1904: bool,
    /// Shared string table, loaded on first sheet access
    shared_strings: Option<Vec<String>>,
}

impl Workbook {
    /// Opens a workbook.
    ///
    /// Fails with `FileNotFound` when `path` does not exist and with
    /// `InvalidFormat` when its extension is not in `allowed_extensions`
    /// or its content is not a workbook package.
    pub fn open(path: &Path, allowed_extensions: &[String]) -> Result<Workbook, LoadoutError> {
        let shown = path.display().to_string();
        let invalid = |reason: String| SpreadsheetError::InvalidFormat {
            path: shown.to_owned(),
            reason,
        };

        if !path.exists() {
            Err(SpreadsheetError::FileNotFound { path: shown.to_owned() })?;
        }
        if !path.is_file() {
            Err(invalid("not a regular file".to_owned()))?;
        }

        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();
        if !allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(extension)) {
            Err(invalid(format!(
                "unsupported file type '.{extension}', expected one of: {}",
                allowed_extensions.join(", ")
            )))?;
        }

        let bytes = fs::read(path)?;
        let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(|error| invalid(error.to_string()))?;
        let (sheets, is_1904) = load_workbook(&mut zip).map_err(|error| invalid(error.to_string()))?;
        if sheets.is_empty() {
            Err(invalid("workbook contains no worksheets".to_owned()))?;
        }
        let number_formats = load_number_formats(&mut zip).map_err(|error| invalid(error.to_string()))?;

        debug!(path = %shown, sheets = sheets.len(), "opened workbook");
        Ok(Workbook {
            path: path.to_path_buf(),
            zip,
            sheets,
            number_formats,
            is_1904,
            shared_strings: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    /// Loads the named sheet. Names match exactly.
    pub fn sheet(&mut self, name: &str) -> Result<Sheet, LoadoutError> {
        let zip_path = self.sheet_path(name)?;
        if self.shared_strings.is_none() {
            self.shared_strings = Some(load_shared_strings(&mut self.zip)?);
        }
        let shared_strings = self.shared_strings.as_deref().unwrap_or_default();

        let shown = self.path.display().to_string();
        let mut sheet = Sheet::new(name);
        let mut reader = self.zip.xml_reader(&zip_path)?.ok_or_else(|| SpreadsheetError::InvalidFormat {
            path: shown.to_owned(),
            reason: format!("missing worksheet part '{zip_path}'"),
        })?;
        read_sheet(&mut reader, &mut sheet, shared_strings, &self.number_formats, self.is_1904)?;
        debug!(sheet = name, max_row = sheet.max_row(), "loaded sheet");
        Ok(sheet)
    }

    /// Writes `value` into `(row, col)` of `sheet` and persists the package.
    ///
    /// Bounds are checked before anything is touched. The package is rewritten
    /// to a temporary file next to the original and renamed over it; `sheet`
    /// only reflects the new value once that rename has succeeded.
    pub fn write_cell(
        &mut self,
        sheet: &mut Sheet,
        row: usize,
        col: usize,
        value: &str,
        band: ColumnBand,
    ) -> Result<(), LoadoutError> {
        sheet.check_row(row)?;
        if !band.contains(col) {
            Err(SpreadsheetError::ColumnOutOfRange {
                column: index_to_column(col),
                allowed: band.to_string(),
            })?;
        }

        let zip_path = self.sheet_path(&sheet.name)?;
        let original = self.zip.read_bytes(&zip_path)?.ok_or_else(|| SpreadsheetError::InvalidFormat {
            path: self.path.display().to_string(),
            reason: format!("missing worksheet part '{zip_path}'"),
        })?;
        let patched = writer::patch_cell(&original, row, col, value)?;
        let package = writer::rebuild_package(&mut self.zip, &zip_path, &patched.xml, patched.removed_formula)?;
        writer::replace_file(&self.path, &package)?;

        self.zip = ZipArchive::new(Cursor::new(package))?;
        sheet.push(row, col, CellValue::text(value));
        info!(
            path = %self.path.display(),
            sheet = %sheet.name,
            cell = %index_to_reference(row, col),
            "persisted cell edit"
        );
        Ok(())
    }

    fn sheet_path(&self, name: &str) -> Result<String, SpreadsheetError> {
        self.sheets
            .iter()
            .find(|(sheet_name, _)| sheet_name == name)
            .map(|(_, zip_path)| zip_path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound {
                path: self.path.display().to_string(),
                sheet: name.to_owned(),
            })
    }
}

/// Loads worksheet names and their part paths, plus the date system flag
fn load_workbook(zip: &mut Package) -> Result<(Vec<(String, String)>, bool), LoadoutError> {
    let relationships = load_relationships(zip, WORKBOOK_RELATIONSHIPS_PART)?;
    let mut reader = zip.xml_reader(WORKBOOK_PART)?.ok_or_else(|| SpreadsheetError::InvalidFormat {
        path: WORKBOOK_PART.to_owned(),
        reason: "missing workbook part".to_owned(),
    })?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.is_named(TAG_SHEET) => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.is_named(TAG_WORKBOOK_PROPERTIES) => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Maps relationship ids to worksheet part paths
fn load_relationships(zip: &mut Package, path: &str) -> Result<HashMap<String, String>, LoadoutError> {
    let mut relationships: HashMap<String, String> = HashMap::new();
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.is_named(TAG_RELATIONSHIP) => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the package
fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads number formats and maps every cell style to a cell type
fn load_number_formats(zip: &mut Package) -> Result<Vec<CellType>, LoadoutError> {
    let mut reader = match zip.xml_reader(STYLES_PART)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.is_named(TAG_CUSTOM_FORMATS) => custom_formats_context = true,
        Event::End(event) if event.is_named(TAG_CUSTOM_FORMATS) => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.is_named(TAG_CUSTOM_FORMAT) => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format));
            }
        }
        Event::Start(event) if event.is_named(TAG_FORMAT_INDEXES) => format_indexes_context = true,
        Event::End(event) if event.is_named(TAG_FORMAT_INDEXES) => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.is_named(TAG_FORMAT_INDEX) => {
            let id = event.get_attribute_value("numFmtId")?.map(|id| id.to_string());
            format_indexes.push(id.unwrap_or_else(|| "0".to_owned()));
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads the full shared string table
fn load_shared_strings(zip: &mut Package) -> Result<Vec<String>, LoadoutError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PART)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.is_named(TAG_SHARED_STRING_ITEM) => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads every cell element of a worksheet into `sheet`
fn read_sheet<R: BufRead>(
    reader: &mut XmlReader<R>,
    sheet: &mut Sheet,
    shared_strings: &[String],
    number_formats: &[CellType],
    is_1904: bool,
) -> Result<(), LoadoutError> {
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellType::default();
    let mut in_cell = false;
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.is_named(TAG_ROW) => {
            row = event.parse_attribute_value::<usize>("r")?.unwrap_or(row + 1);
            col = 0;
        }
        Event::Start(event) if event.is_named(TAG_CELL) => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row.max(1), col + 1));
            kind = CellType::from_type_attribute(event.get_attribute_value("t")?.as_deref());
            if kind == CellType::Number {
                if let Some(style) = event.parse_attribute_value::<usize>("s")? {
                    kind = number_formats.get(style).copied().unwrap_or(CellType::Number);
                }
            }
            in_cell = true;
            value.clear();
            sheet.touch(row, col);
        }
        Event::Start(event) if in_cell && event.is_named(TAG_INLINE_STRING) => {
            value = read_string_value(reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if in_cell && event.is_named(TAG_VALUE) => {
            value = read_string_value(reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.is_named(TAG_CELL) => {
            if !value.is_empty() {
                sheet.push(row, col, kind.decode(&value, shared_strings, is_1904));
            }
            in_cell = false;
            value.clear();
        }
    });
    Ok(())
}

/// Reads string content up to `end_tag`, skipping phonetic annotations
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, LoadoutError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.is_named(end_tag) => break,
        Event::Start(event) if event.is_named(TAG_PHONETIC_TEXT) => is_phonetic_text = true,
        Event::End(event) if event.is_named(TAG_PHONETIC_TEXT) => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.is_named(TAG_TEXT) => is_text = true,
        Event::End(event) if is_text && event.is_named(TAG_TEXT) => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixtureCell;
    use crate::test_support::WorkbookFixture;

    fn extensions() -> Vec<String> {
        vec!["xlsx".to_owned(), "xlsm".to_owned()]
    }

    #[test]
    fn open_reads_sheets_and_values() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.xlsx");
        WorkbookFixture::new()
            .sheet("MODELS", vec![
                vec!["Loadout".into(), "Model".into()],
                vec!["Alpha".into(), "m1.bin".into(), FixtureCell::Blank, FixtureCell::Number(7.0)],
                vec![FixtureCell::Inline("Beta".into()), FixtureCell::Date(45306.0)],
            ])
            .sheet("Other", vec![vec!["x".into()]])
            .write(&path)?;

        let mut workbook = Workbook::open(&path, &extensions())?;
        assert_eq!(workbook.sheet_names().collect::<Vec<_>>(), vec!["MODELS", "Other"]);

        let sheet = workbook.sheet("MODELS")?;
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.cell(2, 1), &CellValue::Text("Alpha".into()));
        assert_eq!(sheet.cell(2, 3), &CellValue::Empty);
        assert_eq!(sheet.cell(2, 4), &CellValue::Number(7.0));
        assert_eq!(sheet.cell(3, 1), &CellValue::Text("Beta".into()));
        assert_eq!(sheet.cell(3, 2).to_string(), "2024-01-15 00:00:00");
        Ok(())
    }

    #[test]
    fn open_rejects_missing_and_foreign_files() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let missing = Workbook::open(&dir.path().join("absent.xlsx"), &extensions());
        assert!(matches!(
            missing.err().as_ref().and_then(LoadoutError::as_spreadsheet_error),
            Some(SpreadsheetError::FileNotFound { .. })
        ));

        let text = dir.path().join("notes.txt");
        fs::write(&text, "hello")?;
        let wrong_extension = Workbook::open(&text, &extensions());
        assert!(matches!(
            wrong_extension.err().as_ref().and_then(LoadoutError::as_spreadsheet_error),
            Some(SpreadsheetError::InvalidFormat { .. })
        ));

        let fake = dir.path().join("fake.xlsx");
        fs::write(&fake, "not a zip")?;
        let bad_content = Workbook::open(&fake, &extensions());
        assert!(matches!(
            bad_content.err().as_ref().and_then(LoadoutError::as_spreadsheet_error),
            Some(SpreadsheetError::InvalidFormat { .. })
        ));
        Ok(())
    }

    #[test]
    fn unknown_sheet_is_reported_with_name() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.xlsx");
        WorkbookFixture::new().sheet("MODELS", vec![vec!["a".into()]]).write(&path)?;
        let mut workbook = Workbook::open(&path, &extensions())?;
        match workbook.sheet("models") {
            Err(LoadoutError::SpreadsheetError(SpreadsheetError::SheetNotFound { sheet, .. })) => {
                assert_eq!(sheet, "models");
            }
            other => panic!("unexpected result: {:?}", other.map(|sheet| sheet.max_row())),
        }
        Ok(())
    }

    #[test]
    fn write_cell_persists_and_preserves_other_parts() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.xlsx");
        WorkbookFixture::new()
            .sheet("Sheet1", vec![
                vec!["Name".into(), "Value".into()],
                vec!["a".into(), FixtureCell::Number(1.0)],
                vec!["b".into(), FixtureCell::Blank, FixtureCell::Blank, "d".into()],
            ])
            .sheet("Sheet2", vec![vec!["keep".into()]])
            .write(&path)?;

        let mut workbook = Workbook::open(&path, &extensions())?;
        let mut sheet = workbook.sheet("Sheet1")?;
        workbook.write_cell(&mut sheet, 3, 2, "new & <escaped>", ColumnBand::A_TO_L)?;
        assert_eq!(sheet.cell(3, 2), &CellValue::Text("new & <escaped>".into()));
        drop(workbook);

        let mut reopened = Workbook::open(&path, &extensions())?;
        let sheet = reopened.sheet("Sheet1")?;
        assert_eq!(sheet.cell(3, 1), &CellValue::Text("b".into()));
        assert_eq!(sheet.cell(3, 2), &CellValue::Text("new & <escaped>".into()));
        assert_eq!(sheet.cell(3, 4), &CellValue::Text("d".into()));
        assert_eq!(sheet.cell(2, 2), &CellValue::Number(1.0));
        let other = reopened.sheet("Sheet2")?;
        assert_eq!(other.cell(1, 1), &CellValue::Text("keep".into()));
        Ok(())
    }

    #[test]
    fn reads_dates_in_the_1904_system() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mac.xlsx");
        WorkbookFixture::new()
            .sheet("Sheet1", vec![vec![FixtureCell::Date(1.0)]])
            .date1904(true)
            .write(&path)?;

        let mut workbook = Workbook::open(&path, &extensions())?;
        let sheet = workbook.sheet("Sheet1")?;
        assert_eq!(sheet.cell(1, 1).to_string(), "1904-01-02 00:00:00");
        Ok(())
    }

    const FORMULA_ROW: &str = r#"<row r="1"><c r="A1"><v>2</v></c><c r="B1"><f>A1*2</f><v>4</v></c></row>"#;

    fn package_text(path: &Path, part: &str) -> Result<Option<String>, LoadoutError> {
        let mut zip = ZipArchive::new(fs::File::open(path)?)?;
        let bytes = zip.read_bytes(part)?;
        Ok(bytes.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    #[test]
    fn replacing_a_formula_drops_the_calc_chain() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.xlsx");
        WorkbookFixture::new()
            .raw_sheet("Sheet1", FORMULA_ROW)
            .calc_chain(&["B1"])
            .write(&path)?;

        let mut workbook = Workbook::open(&path, &extensions())?;
        let mut sheet = workbook.sheet("Sheet1")?;
        workbook.write_cell(&mut sheet, 1, 2, "plain", ColumnBand::A_TO_L)?;
        drop(workbook);

        assert_eq!(package_text(&path, "xl/calcChain.xml")?, None);
        let content_types = package_text(&path, "[Content_Types].xml")?.unwrap_or_default();
        assert!(!content_types.contains("calcChain"));
        assert!(content_types.contains("/xl/worksheets/sheet1.xml"));
        let relationships = package_text(&path, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
        assert!(!relationships.contains("calcChain"));
        assert!(relationships.contains("worksheets/sheet1.xml"));
        let worksheet = package_text(&path, "xl/worksheets/sheet1.xml")?.unwrap_or_default();
        assert!(!worksheet.contains("<f>"));

        let mut reopened = Workbook::open(&path, &extensions())?;
        let sheet = reopened.sheet("Sheet1")?;
        assert_eq!(sheet.cell(1, 1), &CellValue::Number(2.0));
        assert_eq!(sheet.cell(1, 2), &CellValue::Text("plain".into()));
        Ok(())
    }

    #[test]
    fn editing_a_plain_cell_keeps_the_calc_chain() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.xlsx");
        WorkbookFixture::new()
            .raw_sheet("Sheet1", FORMULA_ROW)
            .calc_chain(&["B1"])
            .write(&path)?;

        let mut workbook = Workbook::open(&path, &extensions())?;
        let mut sheet = workbook.sheet("Sheet1")?;
        workbook.write_cell(&mut sheet, 1, 1, "3", ColumnBand::A_TO_L)?;
        drop(workbook);

        let calc_chain = package_text(&path, "xl/calcChain.xml")?.unwrap_or_default();
        assert!(calc_chain.contains(r#"<c r="B1" i="1"/>"#));
        let worksheet = package_text(&path, "xl/worksheets/sheet1.xml")?.unwrap_or_default();
        assert!(worksheet.contains("<f>A1*2</f>"));
        Ok(())
    }

    #[test]
    fn write_cell_checks_bounds_before_touching_the_file() -> Result<(), LoadoutError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.xlsx");
        WorkbookFixture::new().sheet("Sheet1", vec![vec!["a".into()], vec!["b".into()]]).write(&path)?;
        let before = fs::read(&path)?;

        let mut workbook = Workbook::open(&path, &extensions())?;
        let mut sheet = workbook.sheet("Sheet1")?;
        let row = workbook.write_cell(&mut sheet, 3, 1, "x", ColumnBand::A_TO_L);
        assert!(matches!(
            row.err().as_ref().and_then(LoadoutError::as_spreadsheet_error),
            Some(SpreadsheetError::RowOutOfRange { row: 3, max_row: 2, .. })
        ));
        let col = workbook.write_cell(&mut sheet, 1, 13, "x", ColumnBand::A_TO_L);
        assert!(matches!(
            col.err().as_ref().and_then(LoadoutError::as_spreadsheet_error),
            Some(SpreadsheetError::ColumnOutOfRange { .. })
        ));
        assert_eq!(fs::read(&path)?, before);
        assert_eq!(sheet.cell(1, 1), &CellValue::Text("a".into()));
        Ok(())
    }
}
