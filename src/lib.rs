//! # Loadout Sheet
//!
//! Sandboxed lookup, search and editing of "loadouts": named configuration
//! rows kept in an Excel workbook, one loadout per row, keyed by column A.
//!
//! ## Features
//!
//! - **Sandboxed paths**: caller-supplied file names are resolved under a fixed
//!   root; traversal, absolute paths and (in strict mode) URLs are refused
//! - **Row lookup**: by explicit 1-based row or by exact match on the key column
//! - **Atomic cell edits**: a single cell is patched in place and the package is
//!   replaced through a temporary file, preserving every other part
//! - **Selection policies**: random, increment and decrement choice over the
//!   loadout names with an explicit, shareable cursor
//! - **Change detection**: modification-time stamps that drive a cached
//!   dropdown list of loadout names
//! - **Asset hand-off**: checkpoint, text encoder and VAE names handed to a
//!   caller-provided [`AssetCatalog`](assets::AssetCatalog)
//!
//! ## Operations
//!
//! All operations live on [`LoadoutService`](service::LoadoutService):
//!
//! - `read_row_range`: one row over a column band plus its `%A: .. %` summary
//! - `edit_cell`: write one cell in columns A to L, returning the edited row
//! - `read_column`: non-empty values of a column below the header
//! - `select_loadout`: selected and auto loadout names
//! - `loadout_options`: the dropdown list, never failing
//! - `resolve_loadout_row` / `load_loadout`: asset names of a named loadout

pub mod assets;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod sandbox;
pub mod selection;
pub mod service;
pub mod signal;
pub mod spreadsheet;

mod helpers;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::LoadoutError;
pub use service::LoadoutService;
