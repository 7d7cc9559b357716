use thiserror::Error;

/// Main error type for the loadout sheet crate.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum LoadoutError {
    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain errors
    #[error("{0}")]
    SandboxError(#[from] crate::sandbox::SandboxError),

    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    AssetError(#[from] crate::assets::AssetError),
}

impl LoadoutError {
    /// Returns the spreadsheet failure wrapped by this error, if any
    pub fn as_spreadsheet_error(&self) -> Option<&crate::spreadsheet::SpreadsheetError> {
        match self {
            LoadoutError::SpreadsheetError(error) => Some(error),
            _ => None,
        }
    }

    /// True when the failure is a sandbox violation
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, LoadoutError::SandboxError(_))
    }
}
