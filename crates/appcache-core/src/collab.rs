//! Interfaces to collaborators outside the cache: ownership queries,
//! user-facing notifications and filesystem primitives.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::error;

use crate::AppId;

/// Answers whether the current user owns an application.
pub trait OwnershipOracle {
    fn is_owned(&self, app_id: AppId) -> bool;
}

/// Surface for errors the user has to see.
pub trait Notifier {
    fn notify_fatal(&self, message: &str);
}

/// Directory creation and existence checks used for asset paths.
pub trait CacheFs {
    /// Create `path` and its parents. Succeeds when it already exists.
    fn ensure_dir(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl CacheFs for LocalFs {
    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Writes fatal messages to stderr and the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_fatal(&self, message: &str) {
        error!(error = message, "Fatal error");
        eprintln!("Error: {}", message);
    }
}

/// Ownership backed by a fixed set of app ids.
#[derive(Debug, Default, Clone)]
pub struct OwnedSet {
    ids: HashSet<AppId>,
}

impl OwnedSet {
    pub fn new(ids: impl IntoIterator<Item = AppId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Parse one app id per line. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, std::num::ParseIntError> {
        let ids = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::parse::<AppId>)
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl OwnershipOracle for OwnedSet {
    fn is_owned(&self, app_id: AppId) -> bool {
        self.ids.contains(&app_id)
    }
}
