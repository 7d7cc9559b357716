//! Stateful choice of an "auto" loadout over the names in a key column.

use crate::spreadsheet::Sheet;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::fmt::Display;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use tracing::warn;

/// Placeholder for a blank key cell, and the selection fallback.
pub const EMPTY_OPTION: &str = "empty";
/// Auto choice reported when no non-empty option exists.
pub const BLANK_SHEET: &str = "Sheet is blank";
/// Prefix of option-list failure sentinels, which are never selectable.
pub const ERROR_PREFIX: &str = "ERROR:";

/// How the auto loadout is picked.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Random,
    Increment,
    Decrement,
}

impl SelectionMode {
    /// Parses a mode name case-insensitively. Unknown names fall back to
    /// [`SelectionMode::Random`].
    pub fn parse(mode: &str) -> SelectionMode {
        match mode.trim().to_ascii_lowercase().as_str() {
            "random" => SelectionMode::Random,
            "increment" => SelectionMode::Increment,
            "decrement" => SelectionMode::Decrement,
            _ => {
                warn!(mode, "unknown selection mode, using random");
                SelectionMode::Random
            }
        }
    }
}

impl Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SelectionMode::Random => "random",
            SelectionMode::Increment => "increment",
            SelectionMode::Decrement => "decrement",
        })
    }
}

/// Position shared by the increment and decrement modes.
///
/// Both modes read and advance the same counter, so alternating them
/// interleaves their sequences. The counter only grows; it is reset
/// explicitly or not at all.
#[derive(Debug, Default)]
pub struct SelectionCursor {
    position: AtomicUsize,
}

impl SelectionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::SeqCst)
    }

    /// Returns the current position and moves past it.
    pub fn advance(&self) -> usize {
        self.position.fetch_add(1, Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.position.store(0, Ordering::SeqCst);
    }
}

/// Options derived from the key column, row 2 downward.
///
/// Blank cells keep their slot as [`EMPTY_OPTION`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionSet {
    options: Vec<String>,
}

impl OptionSet {
    pub fn from_sheet(sheet: &Sheet, key_column: usize) -> OptionSet {
        let options = (2..=sheet.max_row())
            .map(|row| {
                let text = sheet.cell(row, key_column).to_string();
                match text.trim() {
                    "" => EMPTY_OPTION.to_owned(),
                    trimmed => trimmed.to_owned(),
                }
            })
            .collect();
        OptionSet { options }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Options with the blank placeholders removed, in order.
    pub fn non_empty(&self) -> Vec<&str> {
        self.options
            .iter()
            .map(String::as_str)
            .filter(|option| *option != EMPTY_OPTION)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.iter().any(|option| option == name)
    }
}

impl<S: Into<String>> FromIterator<S> for OptionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        OptionSet {
            options: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a selection call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// The requested name if it is a live option, otherwise [`EMPTY_OPTION`]
    pub selected: String,
    /// The name picked by the selection mode
    pub auto: String,
}

/// Computes the selected and auto names.
///
/// Increment yields `non_empty[cursor % len]`, decrement yields
/// `non_empty[len - 1 - cursor % len]`; both advance `cursor`. With no
/// non-empty option every mode reports [`BLANK_SHEET`] and the cursor stays put.
pub fn select<R: Rng + ?Sized>(
    options: &OptionSet,
    requested: &str,
    mode: SelectionMode,
    cursor: &SelectionCursor,
    rng: &mut R,
) -> Selection {
    let selected = if options.contains(requested) && !requested.starts_with(ERROR_PREFIX) {
        requested.to_owned()
    } else {
        EMPTY_OPTION.to_owned()
    };

    let non_empty = options.non_empty();
    let auto = if non_empty.is_empty() {
        BLANK_SHEET
    } else {
        match mode {
            SelectionMode::Random => non_empty.choose(rng).copied().unwrap_or(BLANK_SHEET),
            SelectionMode::Increment => non_empty[cursor.advance() % non_empty.len()],
            SelectionMode::Decrement => non_empty[non_empty.len() - 1 - cursor.advance() % non_empty.len()],
        }
    };

    Selection {
        selected,
        auto: auto.to_owned(),
    }
}
