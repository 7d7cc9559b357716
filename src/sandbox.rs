//! Confinement of caller-supplied file names to a fixed root directory.
//!
//! Resolution is purely lexical: nothing here touches the filesystem, so a
//! file that does not exist yet resolves fine and is reported later by the
//! workbook layer. Both `/` and `\` are treated as separators, which keeps
//! mixed-separator traversal (`..\..\etc`) from slipping past the checks.

use regex::Regex;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

static DRIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:").expect("Hardcode regex pattern"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// A root directory that every resolved path must stay strictly inside.
#[derive(Clone, Debug)]
pub struct Sandbox {
    root: PathBuf,
    strict: bool,
}

impl Sandbox {
    /// Creates a sandbox rooted at `root`, made absolute against the current
    /// directory and lexically normalized.
    ///
    /// In strict mode every `..` segment and every URL-like input is refused
    /// outright. Otherwise interior `..` segments are accepted as long as the
    /// normalized path remains under the root.
    pub fn new(root: impl AsRef<Path>, strict: bool) -> Result<Sandbox, SandboxError> {
        let root = root.as_ref();
        let absolute = std::path::absolute(root).map_err(|error| SandboxError::InvalidPath {
            path: root.display().to_string(),
            reason: error.to_string(),
        })?;
        Ok(Sandbox {
            root: normalize_root(&absolute),
            strict,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Resolves `relative` to an absolute path that is a strict descendant of
    /// the root. Fails with `InvalidPath` on any violation.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let invalid = |reason: &str| SandboxError::InvalidPath {
            path: relative.to_owned(),
            reason: reason.to_owned(),
        };

        if relative.trim().is_empty() {
            return Err(invalid("path is empty"));
        }
        if relative.contains('\0') {
            return Err(invalid("path contains a NUL character"));
        }
        if relative.starts_with('/') || relative.starts_with('\\') {
            return Err(invalid("absolute paths are not allowed"));
        }
        if DRIVE_PREFIX.is_match(relative) || Path::new(relative).is_absolute() {
            return Err(invalid("absolute paths are not allowed"));
        }
        if self.strict && is_url_like(relative) {
            return Err(invalid("URLs are not allowed"));
        }

        let segments: Vec<&str> = relative
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        if segments.first() == Some(&"..") {
            return Err(invalid("path escapes the sandbox root"));
        }
        if self.strict && segments.contains(&"..") {
            return Err(invalid("parent directory segments are not allowed"));
        }

        let mut normalized: Vec<&str> = Vec::with_capacity(segments.len());
        for segment in segments {
            if segment == ".." {
                if normalized.pop().is_none() {
                    return Err(invalid("path escapes the sandbox root"));
                }
            } else {
                normalized.push(segment);
            }
        }
        if normalized.is_empty() {
            return Err(invalid("path does not name a file inside the sandbox root"));
        }

        let resolved: PathBuf = normalized.iter().fold(self.root.clone(), |path, segment| path.join(segment));
        if !resolved.starts_with(&self.root) || resolved == self.root {
            return Err(invalid("path escapes the sandbox root"));
        }

        debug!(input = relative, resolved = %resolved.display(), "resolved sandbox path");
        Ok(resolved)
    }
}

/// `scheme:...` with a scheme longer than one letter (single letters are drives)
fn is_url_like(input: &str) -> bool {
    input.contains("://")
        || Url::parse(input)
            .map(|url| url.scheme().len() > 1)
            .unwrap_or(false)
}

/// Removes `.` and resolves `..` components without touching the filesystem
fn normalize_root(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> Sandbox {
        Sandbox::new("/srv/loadouts", true).expect("sandbox")
    }

    fn lenient() -> Sandbox {
        Sandbox::new("/srv/loadouts", false).expect("sandbox")
    }

    #[test]
    fn resolves_plain_relative_paths() {
        let sandbox = strict();
        assert_eq!(sandbox.resolve("book.xlsx"), Ok(PathBuf::from("/srv/loadouts/book.xlsx")));
        assert_eq!(sandbox.resolve("./sub/book.xlsx"), Ok(PathBuf::from("/srv/loadouts/sub/book.xlsx")));
        assert_eq!(sandbox.resolve("sub\\book.xlsx"), Ok(PathBuf::from("/srv/loadouts/sub/book.xlsx")));
    }

    #[test]
    fn rejects_absolute_and_prefixed_paths_in_both_modes() {
        for sandbox in [strict(), lenient()] {
            for input in ["/etc/passwd", "\\\\server\\share\\book.xlsx", "C:\\book.xlsx", "c:book.xlsx", "", "  "] {
                assert!(sandbox.resolve(input).is_err(), "accepted {input:?}");
            }
        }
    }

    #[test]
    fn rejects_parent_segments() {
        for sandbox in [strict(), lenient()] {
            for input in ["../book.xlsx", "..\\book.xlsx", "./../book.xlsx", "a/../../book.xlsx", "a/.."] {
                assert!(sandbox.resolve(input).is_err(), "accepted {input:?}");
            }
        }
        assert!(strict().resolve("a/../book.xlsx").is_err());
        assert!(strict().resolve("a/b/..\\book.xlsx").is_err());
    }

    #[test]
    fn lenient_mode_allows_contained_parent_segments() {
        assert_eq!(lenient().resolve("a/../book.xlsx"), Ok(PathBuf::from("/srv/loadouts/book.xlsx")));
        assert_eq!(lenient().resolve("a\\b\\..\\book.xlsx"), Ok(PathBuf::from("/srv/loadouts/a/book.xlsx")));
    }

    #[test]
    fn strict_mode_rejects_urls() {
        assert!(strict().resolve("https://example.com/book.xlsx").is_err());
        assert!(strict().resolve("file:book.xlsx").is_err());
        assert!(lenient().resolve("file:book.xlsx").is_ok());
    }

    #[test]
    fn resolved_paths_are_strict_descendants() {
        let sandbox = lenient();
        for input in ["book.xlsx", "a/b/c.xlsx", "a/./b/../c.xlsx"] {
            let resolved = sandbox.resolve(input).expect("resolve");
            assert!(resolved.starts_with(sandbox.root()));
            assert_ne!(resolved, sandbox.root());
        }
    }

    #[test]
    fn root_is_normalized() {
        let sandbox = Sandbox::new("/srv/./loadouts/../loadouts", true).expect("sandbox");
        assert_eq!(sandbox.root(), Path::new("/srv/loadouts"));
    }
}
