//! Path exclusion utilities
//!
//! User-supplied glob patterns (`--exclude`) protect paths from being
//! indexed, packaged, generated or removed. A pattern excludes a path when it
//! matches the whole role-relative path or any single component of it, so
//! the default `.*` covers both `.gitignore` and everything under `.git/`.

use std::path::{Component, Path};

use glob::Pattern;

use crate::error::Result;

/// Compiled set of exclusion globs
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    /// Compile the given glob patterns; blank entries are ignored.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| Pattern::new(&p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Compile a comma-separated pattern list as given on the command line.
    pub fn from_csv(list: &str) -> Result<Self> {
        Self::new(list.split(','))
    }

    /// Check whether a role-relative path is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let full = relative.to_string_lossy();
        self.patterns.iter().any(|pattern| {
            pattern.matches(&full)
                || relative.components().any(|component| match component {
                    Component::Normal(name) => pattern.matches(&name.to_string_lossy()),
                    _ => false,
                })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Render a role-relative path with forward slashes, for stable identities.
pub fn display_relative(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
