//! The operation surface consumed by the pipeline layer.
//!
//! Every operation resolves its path through the sandbox, takes the lock of
//! the resolved file, opens a fresh [`Workbook`] and drops it before
//! returning. Nothing but the selection cursor and the option list cache
//! outlives a call.

use crate::assets::load_assets;
use crate::assets::AssetCatalog;
use crate::assets::LoadedAssets;
use crate::assets::LoadoutRow;
use crate::config::Settings;
use crate::error::LoadoutError;
use crate::locator::locate;
use crate::sandbox::Sandbox;
use crate::selection::select;
use crate::selection::OptionSet;
use crate::selection::Selection;
use crate::selection::SelectionCursor;
use crate::selection::SelectionMode;
use crate::signal::ChangeSignal;
use crate::signal::ChangeStamp;
use crate::signal::StampedCache;
use crate::spreadsheet::reference::column_to_index;
use crate::spreadsheet::reference::MAX_COLUMN;
use crate::spreadsheet::ColumnBand;
use crate::spreadsheet::RowRecord;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing::warn;

/// First entry of every option list.
pub const DEFAULT_OPTION: &str = "Default";
pub const FILE_NOT_FOUND: &str = "ERROR: FILE NOT FOUND";
pub const SHEET_NOT_FOUND: &str = "ERROR: SHEET NOT FOUND";
pub const NO_DATA_FOUND: &str = "ERROR: NO DATA FOUND";
pub const READ_FAILED: &str = "ERROR: READ FAILED";
pub const INVALID_PATH: &str = "ERROR: INVALID PATH";

/// Columns A to D of a loadout row: name, checkpoint, text encoder, VAE.
const LOADOUT_COLUMNS: ColumnBand = ColumnBand { first: 1, last: 4 };

/// One mutex per resolved file path, present only while someone holds or
/// waits for it.
#[derive(Debug, Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    /// Runs `operation` while holding the lock of `path`.
    fn with<T>(&self, path: &Path, operation: impl FnOnce() -> T) -> T {
        let lock = self.locks.lock().entry(path.to_path_buf()).or_default().clone();
        let result = {
            let _guard = lock.lock();
            operation()
        };
        drop(lock);

        // The registry holds the last reference: nobody else is inside or queued.
        let mut locks = self.locks.lock();
        if locks.get(path).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(path);
        }
        result
    }

    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Sandboxed access to loadout workbooks.
pub struct LoadoutService {
    settings: Settings,
    sandbox: Sandbox,
    signal: ChangeSignal,
    cursor: Arc<SelectionCursor>,
    locks: PathLocks,
    options: StampedCache<(PathBuf, String), Vec<String>>,
}

impl LoadoutService {
    /// Creates a service with its own selection cursor starting at 0.
    pub fn new(settings: Settings) -> Result<LoadoutService, LoadoutError> {
        Self::with_cursor(settings, Arc::new(SelectionCursor::new()))
    }

    /// Creates a service that advances a caller-owned cursor, so several
    /// services can share one position.
    pub fn with_cursor(settings: Settings, cursor: Arc<SelectionCursor>) -> Result<LoadoutService, LoadoutError> {
        settings.validate()?;
        let sandbox = Sandbox::new(&settings.sandbox_root, settings.strict_paths)?;
        let signal = ChangeSignal::new(settings.refresh_interval());
        debug!(root = %sandbox.root().display(), strict = sandbox.is_strict(), "created loadout service");
        Ok(LoadoutService {
            settings,
            sandbox,
            signal,
            cursor,
            locks: PathLocks::default(),
            options: StampedCache::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn cursor(&self) -> &SelectionCursor {
        &self.cursor
    }

    /// Reads one row across `band`.
    ///
    /// A non-empty `search` locates the row through the key column and
    /// overrides `row`.
    pub fn read_row_range(
        &self,
        path: &str,
        sheet: &str,
        row: usize,
        search: Option<&str>,
        band: ColumnBand,
    ) -> Result<RowRecord, LoadoutError> {
        self.with_sheet(path, sheet, |sheet| {
            let row = locate(sheet, row, self.settings.key_column_index(), search)?;
            Ok(sheet.read_row(row, band)?)
        })
    }

    /// Writes `value` into `column` of `row` and returns the edited row as
    /// `A<row>: <value>, B<row>: <value>, ...` over the editable band.
    /// Row 1 is addressable like any other row.
    pub fn edit_cell(
        &self,
        path: &str,
        sheet: &str,
        row: usize,
        column: &str,
        value: &str,
    ) -> Result<String, LoadoutError> {
        let band = self.settings.edit_columns;
        let col = column_to_index(column.trim())
            .filter(|col| band.contains(*col))
            .ok_or_else(|| SpreadsheetError::ColumnOutOfRange {
                column: column.to_owned(),
                allowed: band.to_string(),
            })?;

        let resolved = self.sandbox.resolve(path)?;
        let listing = self.locks.with(&resolved, || -> Result<String, LoadoutError> {
            let mut workbook = Workbook::open(&resolved, &self.settings.allowed_extensions)?;
            let mut sheet_view = workbook.sheet(sheet)?;
            workbook.write_cell(&mut sheet_view, row, col, value, band)?;
            Ok(sheet_view.read_row(row, band)?.listing())
        })?;
        self.options.invalidate(|(cached, _)| *cached == resolved);
        Ok(listing)
    }

    /// Joins the non-empty values of `column` from row 2 down with `", "`.
    pub fn read_column(&self, path: &str, sheet: &str, column: &str) -> Result<String, LoadoutError> {
        let col = column_to_index(column.trim()).ok_or_else(|| SpreadsheetError::ColumnOutOfRange {
            column: column.to_owned(),
            allowed: ColumnBand { first: 1, last: MAX_COLUMN }.to_string(),
        })?;
        self.with_sheet(path, sheet, |sheet| {
            Ok(sheet.read_column(col, 2).collect::<Vec<_>>().join(", "))
        })
    }

    /// Picks the selected and auto loadouts with a thread-local random source.
    pub fn select_loadout(
        &self,
        path: &str,
        sheet: &str,
        requested: &str,
        mode: SelectionMode,
    ) -> Result<Selection, LoadoutError> {
        self.select_loadout_with_rng(path, sheet, requested, mode, &mut rand::rng())
    }

    /// Picks the selected and auto loadouts. The option set is derived from
    /// the sheet on every call.
    pub fn select_loadout_with_rng<R: Rng + ?Sized>(
        &self,
        path: &str,
        sheet: &str,
        requested: &str,
        mode: SelectionMode,
        rng: &mut R,
    ) -> Result<Selection, LoadoutError> {
        let options = self.with_sheet(path, sheet, |sheet| {
            Ok(OptionSet::from_sheet(sheet, self.settings.key_column_index()))
        })?;
        let selection = select(&options, requested, mode, &self.cursor, rng);
        debug!(%mode, selected = %selection.selected, auto = %selection.auto, "selected loadout");
        Ok(selection)
    }

    /// The dropdown list: [`DEFAULT_OPTION`] followed by every non-empty key
    /// in the key column, header included.
    ///
    /// Never fails. Problems are reported as a single `ERROR: ...` entry
    /// after [`DEFAULT_OPTION`]. Lists are cached until the file's
    /// [`ChangeStamp`] moves; error lists are never cached.
    pub fn loadout_options(&self, path: &str, sheet: &str) -> Vec<String> {
        let resolved = match self.sandbox.resolve(path) {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!(%error, "cannot list loadouts");
                return vec![DEFAULT_OPTION.to_owned(), INVALID_PATH.to_owned()];
            }
        };
        let stamp = self.signal.probe(&resolved);
        self.options
            .get_or_try_refresh((resolved.clone(), sheet.to_owned()), stamp, || {
                self.read_options(&resolved, sheet)
            })
            .unwrap_or_else(|sentinel| vec![DEFAULT_OPTION.to_owned(), sentinel.to_owned()])
    }

    /// Reports whether the file behind `path` changed since `last` was taken.
    /// Unresolvable paths always report a change.
    pub fn has_changed_since(&self, path: &str, last: Option<&ChangeStamp>) -> (bool, ChangeStamp) {
        match self.sandbox.resolve(path) {
            Ok(resolved) => self.signal.has_changed_since(&resolved, last),
            Err(error) => {
                debug!(%error, "change probe on invalid path");
                (true, ChangeStamp::unavailable())
            }
        }
    }

    /// Finds the row named `name` in the key column and returns its asset names.
    pub fn resolve_loadout_row(&self, path: &str, sheet: &str, name: &str) -> Result<LoadoutRow, LoadoutError> {
        self.with_sheet(path, sheet, |sheet| {
            let key_column = self.settings.key_column_index();
            if name.trim().is_empty() {
                return Err(SpreadsheetError::SearchKeyNotFound {
                    sheet: sheet.name().to_owned(),
                    column: self.settings.key_column.to_owned(),
                    key: name.to_owned(),
                }
                .into());
            }
            let row = locate(sheet, 0, key_column, Some(name))?;
            let record = sheet.read_row(row, LOADOUT_COLUMNS)?;
            Ok(LoadoutRow::from_record(name, &record))
        })
    }

    /// Resolves `name` and loads its assets through `catalog`.
    pub fn load_loadout<C: AssetCatalog>(
        &self,
        path: &str,
        sheet: &str,
        name: &str,
        catalog: &C,
    ) -> Result<LoadedAssets<C::Asset>, LoadoutError> {
        let row = self.resolve_loadout_row(path, sheet, name)?;
        Ok(load_assets(&row, catalog)?)
    }

    /// Runs `operation` on a sheet while holding the file's lock.
    fn with_sheet<T>(
        &self,
        path: &str,
        sheet: &str,
        operation: impl FnOnce(&Sheet) -> Result<T, LoadoutError>,
    ) -> Result<T, LoadoutError> {
        let resolved = self.sandbox.resolve(path)?;
        self.locks.with(&resolved, || -> Result<T, LoadoutError> {
            let mut workbook = Workbook::open(&resolved, &self.settings.allowed_extensions)?;
            let sheet = workbook.sheet(sheet)?;
            operation(&sheet)
        })
    }

    /// Reads the option list, or the sentinel describing why it cannot be read.
    fn read_options(&self, resolved: &Path, sheet: &str) -> Result<Vec<String>, &'static str> {
        let sheet_view = self.locks.with(resolved, || {
            Workbook::open(resolved, &self.settings.allowed_extensions).and_then(|mut workbook| workbook.sheet(sheet))
        });
        let sheet_view = match sheet_view {
            Ok(sheet_view) => sheet_view,
            Err(failure) => {
                warn!(path = %resolved.display(), sheet, error = %failure, "cannot list loadouts");
                return Err(match failure.as_spreadsheet_error() {
                    Some(SpreadsheetError::FileNotFound { .. }) => FILE_NOT_FOUND,
                    Some(SpreadsheetError::SheetNotFound { .. }) => SHEET_NOT_FOUND,
                    _ => READ_FAILED,
                });
            }
        };

        let mut options = vec![DEFAULT_OPTION.to_owned()];
        options.extend(
            sheet_view
                .read_column(self.settings.key_column_index(), 1)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
        );
        if options.len() == 1 {
            return Err(NO_DATA_FOUND);
        }
        debug!(path = %resolved.display(), sheet, count = options.len() - 1, "listed loadouts");
        Ok(options)
    }
}
