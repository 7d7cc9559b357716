//! Event-level access to the SpreadsheetML parts of a workbook package.
//!
//! Package parts may bind the main namespace to a prefix (`<x:row>`), so
//! elements are matched on their local name only.

use crate::error::LoadoutError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for worksheet parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded into start/end pairs
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, LoadoutError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(LoadoutError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, LoadoutError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, LoadoutError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, LoadoutError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, LoadoutError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => LoadoutError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => LoadoutError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, LoadoutError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, LoadoutError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, LoadoutError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, LoadoutError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Namespace-agnostic element name matching
pub(crate) trait XmlNameHelper {
    /// True when the element's local name, ignoring any prefix, is `local_name`
    fn is_named(&self, local_name: &[u8]) -> bool;
}

impl XmlNameHelper for BytesStart<'_> {
    fn is_named(&self, local_name: &[u8]) -> bool {
        self.local_name().as_ref() == local_name
    }
}

impl XmlNameHelper for BytesEnd<'_> {
    fn is_named(&self, local_name: &[u8]) -> bool {
        self.local_name().as_ref() == local_name
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from a BytesRef event (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), LoadoutError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), LoadoutError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn push_bytes_ref_resolves_entities_and_char_refs() -> Result<(), LoadoutError> {
        let mut reader = XmlReader::new(Cursor::new(b"<t>a&amp;b&#65;&#x42;</t>".to_vec()));
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(text, "a&bAB");
        Ok(())
    }

    #[test]
    fn attribute_helpers_parse_values() -> Result<(), LoadoutError> {
        let mut reader = XmlReader::new(Cursor::new(b"<row r=\"12\" spans=\"x\"/>".to_vec()));
        let mut row = None;
        let mut spans = None;
        match_xml_events!(reader => {
            Event::Start(event) => {
                row = event.parse_attribute_value::<usize>("r")?;
                spans = event.get_attribute_value("spans")?.map(|value| value.to_string());
                assert!(event.parse_attribute_value::<usize>("spans").is_err());
            }
        });
        assert_eq!(row, Some(12));
        assert_eq!(spans.as_deref(), Some("x"));
        Ok(())
    }

    #[test]
    fn names_match_without_namespace_prefix() -> Result<(), LoadoutError> {
        let mut reader = XmlReader::new(Cursor::new(b"<x:sheetData><x:row r=\"1\"/></x:sheetData>".to_vec()));
        let mut rows = 0;
        let mut closed = Vec::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.is_named(b"row") => rows += 1,
            Event::End(event) if event.is_named(b"row") || event.is_named(b"sheetData") => {
                closed.push(String::from_utf8_lossy(event.name().as_ref()).into_owned());
            }
        });
        assert_eq!(rows, 1);
        assert_eq!(closed, vec!["x:row", "x:sheetData"]);
        Ok(())
    }
}
