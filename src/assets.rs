//! Hand-off of a loadout row to the asset loading collaborator.
//!
//! Column B names the checkpoint, columns C and D optionally override its
//! text encoder and VAE. The crate never interprets those names: the
//! [`AssetCatalog`] implementation decides which names exist and how to load
//! them.

use crate::spreadsheet::RowRecord;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

/// Label used in summaries when an override is not applied.
pub const DEFAULT_ASSET: &str = "Default";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Checkpoint,
    TextEncoder,
    Vae,
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AssetKind::Checkpoint => "checkpoint",
            AssetKind::TextEncoder => "text encoder",
            AssetKind::Vae => "VAE",
        })
    }
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("No checkpoint name found for loadout '{loadout}' in column B")]
    MissingPrimary { loadout: String },

    #[error("{kind} '{name}' is not in the allowed list")]
    NotAvailable { kind: AssetKind, name: String },

    #[error("Failed to load {kind} '{name}': {source}")]
    LoadFailed {
        kind: AssetKind,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Asset names stored on one loadout row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadoutRow {
    pub name: String,
    pub row: usize,
    /// Column B
    pub primary: String,
    /// Column C, `None` when blank
    pub secondary: Option<String>,
    /// Column D, `None` when blank
    pub tertiary: Option<String>,
}

impl LoadoutRow {
    /// Builds a row from a record whose band starts at column A.
    pub fn from_record(name: &str, record: &RowRecord) -> LoadoutRow {
        let column = |offset: usize| {
            let text = record.text(offset);
            Some(text.trim().to_owned()).filter(|text| !text.is_empty())
        };
        LoadoutRow {
            name: name.to_owned(),
            row: record.row,
            primary: column(1).unwrap_or_default(),
            secondary: column(2),
            tertiary: column(3),
        }
    }
}

/// The external source of loadable assets.
pub trait AssetCatalog {
    type Asset;

    /// Names that may be loaded for `kind`
    fn available(&self, kind: AssetKind) -> Vec<String>;

    fn load(&self, kind: AssetKind, name: &str) -> anyhow::Result<Self::Asset>;
}

/// Assets resolved for a loadout. Overrides that were not applied are `None`
/// and the checkpoint's own components stay in effect.
#[derive(Debug)]
pub struct LoadedAssets<A> {
    pub checkpoint: A,
    pub text_encoder: Option<A>,
    pub vae: Option<A>,
    /// `Loadout: <name>, Model: <checkpoint>, CLIP: <name|Default>, VAE: <name|Default>`
    pub summary: String,
}

/// Loads the checkpoint named by `row` and applies its overrides.
///
/// The checkpoint is mandatory. An override that is not listed by the
/// catalog or fails to load is skipped with a warning.
pub fn load_assets<C: AssetCatalog>(row: &LoadoutRow, catalog: &C) -> Result<LoadedAssets<C::Asset>, AssetError> {
    if row.primary.is_empty() {
        return Err(AssetError::MissingPrimary {
            loadout: row.name.to_owned(),
        });
    }
    if !catalog.available(AssetKind::Checkpoint).contains(&row.primary) {
        return Err(AssetError::NotAvailable {
            kind: AssetKind::Checkpoint,
            name: row.primary.to_owned(),
        });
    }
    let checkpoint = catalog
        .load(AssetKind::Checkpoint, &row.primary)
        .map_err(|source| AssetError::LoadFailed {
            kind: AssetKind::Checkpoint,
            name: row.primary.to_owned(),
            source,
        })?;

    let text_encoder = load_override(catalog, AssetKind::TextEncoder, row.secondary.as_deref());
    let vae = load_override(catalog, AssetKind::Vae, row.tertiary.as_deref());

    let label = |applied: &Option<(String, C::Asset)>| {
        applied
            .as_ref()
            .map(|(name, _)| name.to_owned())
            .unwrap_or_else(|| DEFAULT_ASSET.to_owned())
    };
    let summary = format!(
        "Loadout: {}, Model: {}, CLIP: {}, VAE: {}",
        row.name,
        row.primary,
        label(&text_encoder),
        label(&vae)
    );
    debug!(%summary, "loaded loadout assets");

    Ok(LoadedAssets {
        checkpoint,
        text_encoder: text_encoder.map(|(_, asset)| asset),
        vae: vae.map(|(_, asset)| asset),
        summary,
    })
}

fn load_override<C: AssetCatalog>(catalog: &C, kind: AssetKind, name: Option<&str>) -> Option<(String, C::Asset)> {
    let name = name?;
    if !catalog.available(kind).iter().any(|available| available == name) {
        warn!(%kind, name, "override is not in the allowed list, keeping default");
        return None;
    }
    match catalog.load(kind, name) {
        Ok(asset) => Some((name.to_owned(), asset)),
        Err(error) => {
            warn!(%kind, name, error = %error, "failed to load override, keeping default");
            None
        }
    }
}
