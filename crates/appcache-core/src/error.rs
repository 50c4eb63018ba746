//! Error types for fetching, parsing and synchronizing the cache.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("Unable to write {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Only local I/O failures are fatal; the remote side may recover on a later run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::LocalIo { .. })
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unable to read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid catalog JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} contains valid JSON, but its format is not supported", path.display())]
    UnsupportedShape { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{} exists but its metadata could not be read: {source}", path.display())]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to create cache directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Whether the environment is unusable, as opposed to a remote hiccup.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Fetch(e) => e.is_fatal(),
            SyncError::Parse(_) | SyncError::MetadataRead { .. } | SyncError::CreateDir { .. } => {
                true
            }
        }
    }

    /// Message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Fetch(FetchError::Transport(_)) | SyncError::Fetch(FetchError::HttpStatus(_)) => {
                "An error occurred while downloading, are you connected to the internet?".to_string()
            }
            SyncError::Fetch(FetchError::LocalIo { path, .. })
            | SyncError::MetadataRead { path, .. }
            | SyncError::CreateDir { path, .. } => format!(
                "An error occurred writing the cache files. Try deleting {} and make sure you \
                 have enough permissions to write to it.",
                path.display()
            ),
            SyncError::Parse(e) => format!("The application catalog could not be read: {}", e),
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
