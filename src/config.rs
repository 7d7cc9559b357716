//! Service settings, read from TOML.

use crate::spreadsheet::reference::column_to_index;
use crate::spreadsheet::ColumnBand;
use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for a [`LoadoutService`](crate::service::LoadoutService).
///
/// Missing fields take their defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory every workbook path is resolved against.
    pub sandbox_root: PathBuf,

    /// Refuse every `..` segment and URL-like path instead of only escapes.
    pub strict_paths: bool,

    /// Workbook extensions that may be opened, without the dot.
    pub allowed_extensions: Vec<String>,

    /// Option lists are re-read at least this often even if the file is unchanged.
    pub refresh_interval_secs: u64,

    /// Column holding loadout names.
    pub key_column: String,

    /// Columns `edit_cell` may write.
    pub edit_columns: ColumnBand,

    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sandbox_root: PathBuf::from("."),
            strict_paths: true,
            allowed_extensions: vec!["xlsx".to_string(), "xlsm".to_string()],
            refresh_interval_secs: 10,
            key_column: "A".to_string(),
            edit_columns: ColumnBand::A_TO_L,
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(anyhow!("refresh_interval_secs must be > 0"));
        }
        if self.allowed_extensions.is_empty() || self.allowed_extensions.iter().any(|ext| ext.trim().is_empty()) {
            return Err(anyhow!("allowed_extensions must be a non-empty array of names"));
        }
        if self.allowed_extensions.iter().any(|ext| ext.starts_with('.')) {
            return Err(anyhow!("allowed_extensions must not include the leading dot"));
        }
        if column_to_index(self.key_column.trim()).is_none() {
            return Err(anyhow!("key_column '{}' is not a column letter", self.key_column));
        }
        Ok(())
    }

    /// 1-based index of the key column. Validated settings always have one.
    pub fn key_column_index(&self) -> usize {
        column_to_index(self.key_column.trim()).unwrap_or(1)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn from_toml_str(contents: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(contents).context("parse settings")?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Settings::from_toml_str(&contents).with_context(|| format!("load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.key_column_index(), 1);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("loadout.toml");
        fs::write(&path, "sandbox_root = \"/srv/loadouts\"\nedit_columns = \"A:F\"\nkey_column = \"b\"\n")
            .expect("write");
        let settings = load_settings(&path).expect("load");
        assert_eq!(settings.sandbox_root, PathBuf::from("/srv/loadouts"));
        assert_eq!(settings.edit_columns, ColumnBand::A_TO_F);
        assert_eq!(settings.key_column_index(), 2);
        assert!(settings.strict_paths);
        assert_eq!(settings.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Settings::from_toml_str("refresh_interval_secs = 0").is_err());
        assert!(Settings::from_toml_str("allowed_extensions = []").is_err());
        assert!(Settings::from_toml_str("allowed_extensions = [\".xlsx\"]").is_err());
        assert!(Settings::from_toml_str("key_column = \"A1\"").is_err());
        assert!(Settings::from_toml_str("edit_columns = \"L:A\"").is_err());
    }

    #[test]
    fn invalid_file_reports_its_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("loadout.toml");
        fs::write(&path, "refresh_interval_secs = 0\n").expect("write");
        let error = load_settings(&path).expect_err("zero interval");
        let message = format!("{error:#}");
        assert!(message.contains("loadout.toml"), "{message}");
        assert!(message.contains("refresh_interval_secs"), "{message}");
    }

    #[test]
    fn settings_serialize_back_to_toml() {
        let settings = Settings::default();
        let text = toml::to_string(&settings).expect("serialize");
        assert!(text.contains("edit_columns = \"A:L\""));
        assert_eq!(Settings::from_toml_str(&text).expect("parse"), settings);
    }
}
