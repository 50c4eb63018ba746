use std::path::Path;

use tracing::info;

use super::document::{self, Mapping};
use crate::error::ParseError;
use crate::AppId;

/// In-memory id to display name catalog.
///
/// Contents are only ever replaced wholesale by [`CatalogStore::replace`] or
/// [`CatalogStore::reload`]; there is no incremental patching.
#[derive(Debug, Default, Clone)]
pub struct CatalogStore {
    names: Mapping,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(names: Mapping) -> Self {
        Self { names }
    }

    /// Replace the catalog with the contents of `path`.
    /// On error the previous contents are kept.
    pub fn reload(&mut self, path: &Path) -> Result<usize, ParseError> {
        let names = document::load(path)?;
        info!(path = %path.display(), entries = names.len(), "Loaded catalog");
        self.replace(names);
        Ok(self.names.len())
    }

    pub fn replace(&mut self, names: Mapping) {
        self.names = names;
    }

    /// Display name for `app_id`, or an empty string when unknown.
    pub fn get_name(&self, app_id: AppId) -> String {
        self.names.get(&app_id).cloned().unwrap_or_default()
    }

    pub fn contains(&self, app_id: AppId) -> bool {
        self.names.contains_key(&app_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AppId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Case-insensitive substring search on names, sorted by name then id.
    pub fn search(&self, term: &str) -> Vec<(AppId, &str)> {
        let needle = term.to_lowercase();
        let mut hits: Vec<(AppId, &str)> = self
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| {
            a.1.to_lowercase()
                .cmp(&b.1.to_lowercase())
                .then(a.0.cmp(&b.0))
        });
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    fn store_with(entries: &[(AppId, &str)]) -> CatalogStore {
        CatalogStore::from_mapping(
            entries
                .iter()
                .map(|(id, name)| (*id, name.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_reload_and_get_name() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, r#"[{"id":10,"name":"A"},{"id":20,"name":"B"}]"#).expect("write");

        let mut store = CatalogStore::new();
        assert_eq!(store.reload(&path).expect("reload"), 2);
        assert_eq!(store.get_name(10), "A");
        assert_eq!(store.get_name(20), "B");
        assert_eq!(store.get_name(999), "");
    }

    #[test]
    fn test_reload_replaces_contents() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, r#"[{"id":30,"name":"C"}]"#).expect("write");

        let mut store = store_with(&[(10, "A")]);
        store.reload(&path).expect("reload");
        assert!(!store.contains(10));
        assert_eq!(store.get_name(30), "C");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_contents() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, "garbage").expect("write");

        let mut store = store_with(&[(10, "A")]);
        assert!(store.reload(&path).is_err());
        assert_eq!(store.get_name(10), "A");
    }

    #[test]
    fn test_search() {
        let store = store_with(&[(3, "portal 2"), (1, "Portal"), (2, "Dota 2"), (4, "Half-Life")]);
        let hits = store.search("PORTAL");
        assert_eq!(hits, vec![(1, "Portal"), (3, "portal 2")]);
        assert!(store.search("zzz").is_empty());
    }
}
