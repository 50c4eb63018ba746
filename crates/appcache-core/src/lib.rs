//! appcache core library.
//!
//! Local cache of the Steam application catalog (app id to display name) and
//! of per-application icons:
//!
//! - `fetch`: blocking downloads with skip-if-present and atomic replace
//! - `cache`: TTL freshness checks against file modification times
//! - `paths`: local paths and remote URLs for every cached asset
//! - `catalog`: catalog parsing, filtering and the in-memory store
//! - `sync`: `CatalogSync`, which ties the above together
//! - `collab`: interfaces to ownership, notification and filesystem collaborators

pub mod cache;
pub mod catalog;
pub mod collab;
pub mod error;
pub mod fetch;
pub mod paths;
pub mod sync;

/// Stable numeric identifier of an application.
pub type AppId = u32;

pub use catalog::CatalogStore;
pub use error::{FetchError, ParseError, SyncError};
pub use fetch::{AssetFetcher, FetchOutcome};
pub use paths::{AssetKind, CatalogSource, Endpoints, PathResolver};
pub use sync::{CatalogSync, RetrievalStrategy, SyncReport};
