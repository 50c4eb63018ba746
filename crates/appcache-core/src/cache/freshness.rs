use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, SyncError};

/// Catalog files are re-fetched once a week.
/// The app list changes slowly and is several megabytes, so a daily check would be wasteful.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Age of a cached file, measured from its modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheAge {
    pub modified_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl CacheAge {
    pub fn age_seconds(&self) -> i64 {
        (self.now - self.modified_at).num_seconds()
    }

    pub fn age_minutes(&self) -> i64 {
        (self.now - self.modified_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    /// Fresh while the age does not exceed the TTL; the boundary itself is fresh.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        let age = self.now - self.modified_at;
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age > ttl,
            // A TTL too large to represent never expires
            Err(_) => false,
        }
    }
}

/// Read the age of a cached file, `None` when it does not exist.
pub fn cache_age_at(path: &Path, now: DateTime<Utc>) -> Result<Option<CacheAge>> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SyncError::MetadataRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let modified = metadata.modified().map_err(|source| SyncError::MetadataRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(CacheAge {
        modified_at: DateTime::<Utc>::from(modified),
        now,
    }))
}

pub fn cache_age(path: &Path) -> Result<Option<CacheAge>> {
    cache_age_at(path, Utc::now())
}

/// Whether the file at `path` must be fetched again, judged at `now`.
pub fn needs_refresh_at(path: &Path, ttl: Duration, now: DateTime<Utc>) -> Result<bool> {
    let stale = match cache_age_at(path, now)? {
        None => {
            debug!(path = %path.display(), "Cache file missing");
            true
        }
        Some(age) => {
            let stale = age.is_stale(ttl);
            debug!(
                path = %path.display(),
                age_secs = age.age_seconds(),
                ttl_secs = ttl.as_secs(),
                stale,
                "Checked cache file freshness"
            );
            stale
        }
    };
    Ok(stale)
}

pub fn needs_refresh(path: &Path, ttl: Duration) -> Result<bool> {
    needs_refresh_at(path, ttl, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    fn age_of(minutes: i64) -> CacheAge {
        let now = Utc::now();
        CacheAge {
            modified_at: now - chrono::Duration::minutes(minutes),
            now,
        }
    }

    #[test]
    fn test_missing_file_needs_refresh() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        assert!(needs_refresh(&path, DEFAULT_CATALOG_TTL).expect("check"));
    }

    #[test]
    fn test_ttl_boundary() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, b"{}").expect("write");

        let modified = cache_age(&path)
            .expect("age")
            .expect("file exists")
            .modified_at;
        let ttl = Duration::from_secs(3600);

        let at_boundary = modified + chrono::Duration::seconds(3600);
        assert!(!needs_refresh_at(&path, ttl, at_boundary).expect("check"));

        let past_boundary = modified + chrono::Duration::seconds(3601);
        assert!(needs_refresh_at(&path, ttl, past_boundary).expect("check"));
    }

    #[test]
    fn test_fresh_file_does_not_need_refresh() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, b"{}").expect("write");
        assert!(!needs_refresh(&path, DEFAULT_CATALOG_TTL).expect("check"));
    }

    #[test]
    fn test_unreadable_metadata_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let not_a_dir = dir.path().join("cache");
        std::fs::write(&not_a_dir, b"plain file").expect("write");

        // A path through a regular file fails with NotADirectory, not NotFound
        let err = needs_refresh(&not_a_dir.join("app_names"), Duration::from_secs(1))
            .expect_err("metadata must not be readable");

        assert!(matches!(err, SyncError::MetadataRead { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_default_ttl_is_one_week() {
        assert_eq!(DEFAULT_CATALOG_TTL.as_secs(), 604_800);
    }

    #[test]
    fn test_age_display() {
        assert_eq!(age_of(0).age_display(), "just now");
        assert_eq!(age_of(-5).age_display(), "just now");
        assert_eq!(age_of(42).age_display(), "42m ago");
        assert_eq!(age_of(90).age_display(), "2h ago");
        assert_eq!(age_of(60 * 24 * 3).age_display(), "3d ago");
        assert_eq!(age_of(60 * 24 * 3 + 60 * 13).age_display(), "4d ago");
    }
}
