//! Change detection for backing files, and a cache keyed on it.
//!
//! There is no push channel from the filesystem: callers poll a
//! [`ChangeStamp`] and compare it with the one they saw last. A stamp moves
//! when the modification time moves or when a refresh interval elapses.

use chrono::DateTime;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// A comparable snapshot of a file's state.
#[derive(Clone, Debug)]
pub enum ChangeStamp {
    Observed {
        modified: DateTime<Utc>,
        /// Index of the refresh window the probe fell into
        interval_epoch: i64,
    },
    /// The file could not be resolved or inspected
    Unavailable { at: DateTime<Utc> },
}

impl ChangeStamp {
    pub fn unavailable() -> ChangeStamp {
        ChangeStamp::Unavailable { at: Utc::now() }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ChangeStamp::Observed { .. })
    }
}

/// An unavailable stamp never compares equal, not even to itself, so a
/// caller holding one always sees a change.
impl PartialEq for ChangeStamp {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ChangeStamp::Observed { modified, interval_epoch },
                ChangeStamp::Observed {
                    modified: other_modified,
                    interval_epoch: other_interval_epoch,
                },
            ) => modified == other_modified && interval_epoch == other_interval_epoch,
            _ => false,
        }
    }
}

/// Probes modification times, folding in a periodic refresh.
#[derive(Clone, Debug)]
pub struct ChangeSignal {
    refresh_interval: Duration,
}

impl ChangeSignal {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval: refresh_interval.max(Duration::from_secs(1)),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Stamps `path` as of now.
    pub fn probe(&self, path: &Path) -> ChangeStamp {
        self.probe_at(path, Utc::now())
    }

    /// Stamps `path` as of `now`. Probes whose `now` falls into different
    /// refresh windows never compare equal.
    pub fn probe_at(&self, path: &Path, now: DateTime<Utc>) -> ChangeStamp {
        match fs::metadata(path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => ChangeStamp::Observed {
                modified: DateTime::<Utc>::from(modified),
                interval_epoch: now.timestamp() / self.refresh_interval.as_secs().max(1) as i64,
            },
            Err(error) => {
                debug!(path = %path.display(), %error, "file unavailable for change probe");
                ChangeStamp::Unavailable { at: now }
            }
        }
    }

    /// Probes `path` and reports whether the result differs from `last`.
    /// Without a previous stamp the file always counts as changed.
    pub fn has_changed_since(&self, path: &Path, last: Option<&ChangeStamp>) -> (bool, ChangeStamp) {
        let stamp = self.probe(path);
        let changed = last.map(|last| *last != stamp).unwrap_or(true);
        (changed, stamp)
    }
}

/// Values cached together with the stamp they were computed under.
#[derive(Debug)]
pub struct StampedCache<K, V> {
    entries: Mutex<HashMap<K, (ChangeStamp, V)>>,
}

impl<K: Eq + Hash, V: Clone> StampedCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value if it was computed under `stamp`, otherwise
    /// computes a fresh one.
    ///
    /// Only successes under an available stamp are stored. A failure, or a
    /// file that could not be stamped, drops any entry left for `key`.
    pub fn get_or_try_refresh<E>(
        &self,
        key: K,
        stamp: ChangeStamp,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let mut entries = self.entries.lock();
        if let Some((cached, value)) = entries.get(&key) {
            if *cached == stamp {
                return Ok(value.clone());
            }
        }
        let result = compute();
        match &result {
            Ok(value) if stamp.is_available() => {
                entries.insert(key, (stamp, value.clone()));
            }
            _ => {
                entries.remove(&key);
            }
        }
        result
    }

    /// Drops every entry whose key matches `predicate`.
    pub fn invalidate(&self, predicate: impl Fn(&K) -> bool) {
        self.entries.lock().retain(|key, _| !predicate(key));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for StampedCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
