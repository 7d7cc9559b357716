//! ZIP archive helper utilities for the Office Open XML package format.
//! Provides convenient methods for accessing and copying parts of a workbook package.

use crate::error::LoadoutError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::ZipArchive;
use zip::ZipWriter;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, LoadoutError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, LoadoutError>;

    /// Reads a whole part into memory
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, LoadoutError>;

    /// Copies every entry into `writer`, substituting the parts named in
    /// `replacements` and leaving out the parts named in `removals`
    fn copy_with_changes<W: Write + Seek>(
        &mut self,
        writer: &mut ZipWriter<W>,
        replacements: &[(&str, &[u8])],
        removals: &[&str],
    ) -> Result<(), LoadoutError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Matching is case-insensitive with backslashes normalized to forward slashes
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, LoadoutError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, LoadoutError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, LoadoutError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    fn copy_with_changes<W: Write + Seek>(
        &mut self,
        writer: &mut ZipWriter<W>,
        replacements: &[(&str, &[u8])],
        removals: &[&str],
    ) -> Result<(), LoadoutError> {
        let matches = |pattern: &str, file_name: &str| pattern.replace('\\', "/").eq_ignore_ascii_case(file_name);
        for index in 0..self.len() {
            let mut file = self.by_index(index)?;
            let file_name = file.name().to_owned();
            if removals.iter().any(|removal| matches(removal, &file_name)) {
                continue;
            }

            let mut options = SimpleFileOptions::default().compression_method(file.compression());
            if let Some(modified) = file.last_modified() {
                options = options.last_modified_time(modified);
            }
            if let Some(mode) = file.unix_mode() {
                options = options.unix_permissions(mode);
            }

            if file.is_dir() {
                writer.add_directory(file_name, options)?;
                continue;
            }

            writer.start_file(file_name.as_str(), options)?;
            match replacements.iter().find(|(name, _)| matches(name, &file_name)) {
                Some((_, replacement)) => writer.write_all(replacement)?,
                None => {
                    std::io::copy(&mut file, writer)?;
                }
            }
        }
        Ok(())
    }
}
