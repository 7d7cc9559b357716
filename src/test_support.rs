//! Builders for real workbook files used by unit and integration tests.

use crate::error::LoadoutError;
use quick_xml::escape::escape;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

/// One cell of a fixture row.
#[derive(Clone, Debug, PartialEq)]
pub enum FixtureCell {
    /// Stored in the shared string table
    Text(String),
    /// Stored inline in the worksheet
    Inline(String),
    Number(f64),
    /// Serial number styled with a date format
    Date(f64),
    /// A styled cell element without a value
    Blank,
}

impl From<&str> for FixtureCell {
    fn from(value: &str) -> Self {
        FixtureCell::Text(value.to_owned())
    }
}

impl From<f64> for FixtureCell {
    fn from(value: f64) -> Self {
        FixtureCell::Number(value)
    }
}

enum FixtureSheet {
    Rows(Vec<Vec<FixtureCell>>),
    Raw(String),
}

/// Writes a minimal but complete `.xlsx` package.
#[derive(Default)]
pub struct WorkbookFixture {
    sheets: Vec<(String, FixtureSheet)>,
    date1904: bool,
    /// References listed in `xl/calcChain.xml`, all on the first sheet
    calc_chain: Vec<String>,
}

impl WorkbookFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet; row `i` of `rows` becomes worksheet row `i + 1` and
    /// cell `j` becomes column `j + 1`.
    pub fn sheet(mut self, name: &str, rows: Vec<Vec<FixtureCell>>) -> Self {
        self.sheets.push((name.to_owned(), FixtureSheet::Rows(rows)));
        self
    }

    /// Adds a sheet whose `<sheetData>` content is written verbatim.
    pub fn raw_sheet(mut self, name: &str, sheet_data: &str) -> Self {
        self.sheets.push((name.to_owned(), FixtureSheet::Raw(sheet_data.to_owned())));
        self
    }

    pub fn date1904(mut self, enabled: bool) -> Self {
        self.date1904 = enabled;
        self
    }

    /// Adds a calculation chain listing `references` of the first sheet.
    pub fn calc_chain(mut self, references: &[&str]) -> Self {
        self.calc_chain = references.iter().map(|reference| reference.to_string()).collect();
        self
    }

    pub fn write(&self, path: &Path) -> Result<(), LoadoutError> {
        let mut shared_strings = Vec::<String>::new();
        let worksheets: Vec<String> = self
            .sheets
            .iter()
            .map(|(_, sheet)| match sheet {
                FixtureSheet::Rows(rows) => worksheet_xml(&rows_xml(rows, &mut shared_strings)),
                FixtureSheet::Raw(sheet_data) => worksheet_xml(sheet_data),
            })
            .collect();

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(File::create(path)?);
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(self.content_types_xml().as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELATIONSHIPS.as_bytes())?;
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(self.workbook_xml().as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(self.workbook_relationships_xml().as_bytes())?;
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES.as_bytes())?;
        zip.start_file("xl/sharedStrings.xml", options)?;
        zip.write_all(shared_strings_xml(&shared_strings).as_bytes())?;
        for (index, worksheet) in worksheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
            zip.write_all(worksheet.as_bytes())?;
        }
        if !self.calc_chain.is_empty() {
            zip.start_file("xl/calcChain.xml", options)?;
            zip.write_all(self.calc_chain_xml().as_bytes())?;
        }
        zip.finish()?;
        Ok(())
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
        ));
        for index in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{index}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        if !self.calc_chain.is_empty() {
            xml.push_str(r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#);
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        ));
        if self.date1904 {
            xml.push_str(r#"<workbookPr date1904="1"/>"#);
        }
        xml.push_str("<sheets>");
        for (index, (name, _)) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(name.as_str()),
                index + 1,
                index + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_relationships_xml(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        ));
        let count = self.sheets.len();
        for index in 1..=count {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{index}.xml"/>"#
            ));
        }
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            count + 1
        ));
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="/xl/sharedStrings.xml"/>"#,
            count + 2
        ));
        if !self.calc_chain.is_empty() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/>"#,
                count + 3
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn calc_chain_xml(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        ));
        for reference in &self.calc_chain {
            xml.push_str(&format!(r#"<c r="{reference}" i="1"/>"#));
        }
        xml.push_str("</calcChain>");
        xml
    }
}

const ROOT_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

/// Style 0 is general, style 1 is the built-in date format 14.
const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="2"><xf numFmtId="0" xfId="0"/><xf numFmtId="14" xfId="0" applyNumberFormat="1"/></cellXfs>"#,
    r#"</styleSheet>"#
);

fn worksheet_xml(sheet_data: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            r#"<sheetData>{}</sheetData>"#,
            r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
            r#"</worksheet>"#
        ),
        sheet_data
    )
}

fn rows_xml(rows: &[Vec<FixtureCell>], shared_strings: &mut Vec<String>) -> String {
    let mut xml = String::new();
    for (row_index, row) in rows.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (col_index, cell) in row.iter().enumerate() {
            let reference = crate::spreadsheet::reference::index_to_reference(row_number, col_index + 1);
            match cell {
                FixtureCell::Text(text) => {
                    let index = match shared_strings.iter().position(|shared| shared == text) {
                        Some(index) => index,
                        None => {
                            shared_strings.push(text.to_owned());
                            shared_strings.len() - 1
                        }
                    };
                    xml.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
                }
                FixtureCell::Inline(text) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape(text.as_str())
                )),
                FixtureCell::Number(number) => xml.push_str(&format!(r#"<c r="{reference}"><v>{number}</v></c>"#)),
                FixtureCell::Date(serial) => xml.push_str(&format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#)),
                FixtureCell::Blank => xml.push_str(&format!(r#"<c r="{reference}" s="0"/>"#)),
            }
        }
        xml.push_str("</row>");
    }
    xml
}

fn shared_strings_xml(shared_strings: &[String]) -> String {
    let mut xml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#
        ),
        shared_strings.len()
    );
    for text in shared_strings {
        xml.push_str(&format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(text.as_str())));
    }
    xml.push_str("</sst>");
    xml
}
