//! Application catalog: parsing of the remote app lists and the in-memory
//! id to name store built from them.
//!
//! - `CatalogRecord`, `Mapping`: wire records and the parsed mapping
//! - `CatalogStore`: the in-memory catalog handed out to callers
//! - `filter_out`: prune a full list with an exclusion list

pub mod document;
pub mod store;

pub use document::{filter_out, load, parse_mapping, CatalogRecord, Mapping};
pub use store::CatalogStore;
