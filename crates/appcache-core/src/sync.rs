//! Keeps the catalog files fresh and the in-memory catalog in step with them,
//! and caches per-application icons on demand.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{self, CacheAge, DEFAULT_CATALOG_TTL};
use crate::catalog::{self, CatalogStore};
use crate::collab::{CacheFs, LocalFs, OwnershipOracle};
use crate::error::{Result, SyncError};
use crate::fetch::{AssetFetcher, FetchOutcome};
use crate::paths::{AssetKind, CatalogSource, PathResolver};
use crate::AppId;

/// Where the app id list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Curated games-only list
    FullList,
    /// Steam's list with the not-games list pruned out
    FilteredList,
    /// Steam's list as-is, junk entries included
    #[default]
    RawList,
}

impl RetrievalStrategy {
    pub const ALL: [RetrievalStrategy; 3] = [
        RetrievalStrategy::FullList,
        RetrievalStrategy::FilteredList,
        RetrievalStrategy::RawList,
    ];

    /// Catalog the display names are read from
    pub fn primary(self) -> CatalogSource {
        match self {
            RetrievalStrategy::FullList => CatalogSource::GameList,
            RetrievalStrategy::FilteredList | RetrievalStrategy::RawList => CatalogSource::AppList,
        }
    }

    /// Catalog whose ids are removed from the primary one
    pub fn exclusion(self) -> Option<CatalogSource> {
        match self {
            RetrievalStrategy::FilteredList => Some(CatalogSource::NotGames),
            _ => None,
        }
    }

    pub fn sources(self) -> Vec<CatalogSource> {
        std::iter::once(self.primary()).chain(self.exclusion()).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalStrategy::FullList => "full_list",
            RetrievalStrategy::FilteredList => "filtered_list",
            RetrievalStrategy::RawList => "raw_list",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.replace('-', "_"))
            .ok_or_else(|| {
                format!(
                    "unknown retrieval strategy '{}' (expected full_list, filtered_list or raw_list)",
                    s
                )
            })
    }
}

/// What a call to [`CatalogSync::ensure_catalog_current`] did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub refreshed: Vec<CatalogSource>,
    pub reloaded: bool,
    pub entries: usize,
}

/// Orchestrates freshness checks, downloads and catalog reloads.
///
/// Owns the in-memory catalog; construct one per process and hand it out by
/// reference.
pub struct CatalogSync<F: CacheFs = LocalFs> {
    resolver: PathResolver,
    fetcher: AssetFetcher,
    store: CatalogStore,
    fs: F,
    strategy: RetrievalStrategy,
    catalog_ttl: Duration,
    force_refresh: bool,
}

impl CatalogSync<LocalFs> {
    pub fn new(resolver: PathResolver, fetcher: AssetFetcher) -> Self {
        Self::with_fs(resolver, fetcher, LocalFs)
    }
}

impl<F: CacheFs> CatalogSync<F> {
    pub fn with_fs(resolver: PathResolver, fetcher: AssetFetcher, fs: F) -> Self {
        Self {
            resolver,
            fetcher,
            store: CatalogStore::new(),
            fs,
            strategy: RetrievalStrategy::default(),
            catalog_ttl: DEFAULT_CATALOG_TTL,
            force_refresh: false,
        }
    }

    pub fn with_strategy(mut self, strategy: RetrievalStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    pub fn strategy(&self) -> RetrievalStrategy {
        self.strategy
    }

    pub fn catalog_ttl(&self) -> Duration {
        self.catalog_ttl
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Treat every catalog file as stale on the next sync.
    pub fn force_refresh(&mut self) {
        self.force_refresh = true;
    }

    /// Download stale catalog files and reload the in-memory catalog when a
    /// file changed or nothing has been loaded yet.
    ///
    /// Sources are fetched in order and the first failure is returned. If an
    /// earlier source was already replaced on disk, the catalog is rebuilt from
    /// the files now present before the error is returned; when that rebuild
    /// fails too (e.g. the failing source was never cached) the previously
    /// loaded names are kept.
    pub fn ensure_catalog_current(&mut self) -> Result<SyncReport> {
        let root = self.resolver.cache_root().to_path_buf();
        self.ensure_dir(&root)?;

        let now = Utc::now();
        let mut report = SyncReport::default();

        for source in self.strategy.sources() {
            let path = self.resolver.catalog_path(source);
            let stale =
                self.force_refresh || cache::needs_refresh_at(&path, self.catalog_ttl, now)?;
            if !stale {
                continue;
            }

            if let Err(e) = self.download_catalog(source, &path) {
                if !report.refreshed.is_empty() {
                    self.reload_after_partial_refresh(&report.refreshed);
                }
                return Err(e);
            }
            info!(source = source.file_name(), "Catalog file refreshed");
            report.refreshed.push(source);
        }
        self.force_refresh = false;

        if !report.refreshed.is_empty() || self.store.is_empty() {
            report.entries = self.reload()?;
            report.reloaded = true;
        } else {
            debug!(entries = self.store.len(), "Catalog up to date, keeping loaded names");
            report.entries = self.store.len();
        }

        Ok(report)
    }

    fn download_catalog(&self, source: CatalogSource, path: &Path) -> Result<()> {
        let url = self.resolver.catalog_url(source);
        if self.fs.exists(path) {
            self.fetcher.refresh(&url, path)?;
        } else {
            self.fetcher.fetch(&url, path)?;
        }
        Ok(())
    }

    fn reload_after_partial_refresh(&mut self, refreshed: &[CatalogSource]) {
        let refreshed: Vec<&str> = refreshed.iter().map(|s| s.file_name()).collect();
        match self.reload() {
            Ok(entries) => info!(?refreshed, entries, "Reloaded catalog after partial refresh"),
            Err(e) => warn!(
                ?refreshed,
                error = %e,
                "Catalog not reloaded after partial refresh, keeping loaded names"
            ),
        }
    }

    /// Rebuild the in-memory catalog from the files already on disk without
    /// touching the network.
    pub fn load_cached(&mut self) -> Result<usize> {
        self.reload()
    }

    fn reload(&mut self) -> Result<usize> {
        let primary = self.resolver.catalog_path(self.strategy.primary());
        let mut names = catalog::load(&primary)?;

        if let Some(exclusion) = self.strategy.exclusion() {
            let excluded = catalog::load(&self.resolver.catalog_path(exclusion))?;
            let before = names.len();
            catalog::filter_out(&mut names, &excluded);
            debug!(removed = before - names.len(), "Filtered excluded app ids");
        }

        self.store.replace(names);
        info!(
            strategy = %self.strategy,
            entries = self.store.len(),
            "Catalog loaded"
        );
        Ok(self.store.len())
    }

    /// Display name of `app_id`, empty when unknown.
    pub fn get_display_name(&self, app_id: AppId) -> String {
        self.store.get_name(app_id)
    }

    /// Download the application icon unless it is already cached.
    /// Cached icons are never revalidated.
    pub fn ensure_icon_cached(&self, app_id: AppId) -> Result<FetchOutcome> {
        let path = self.resolver.local_path(app_id, AssetKind::Icon);
        let url = self.resolver.remote_url(app_id, AssetKind::Icon);
        self.fetch_asset(app_id, &url, &path)
    }

    /// Download an achievement icon, stored under `achievement_id` and fetched
    /// from `remote_name`.
    pub fn ensure_achievement_icon_cached(
        &self,
        app_id: AppId,
        achievement_id: &str,
        remote_name: &str,
    ) -> Result<FetchOutcome> {
        let path = self
            .resolver
            .local_path(app_id, AssetKind::AchievementIcon(achievement_id));
        let url = self
            .resolver
            .remote_url(app_id, AssetKind::AchievementIcon(remote_name));
        debug!(app_id, achievement_id, url = %url, "Caching achievement icon");
        self.fetch_asset(app_id, &url, &path)
    }

    fn fetch_asset(&self, app_id: AppId, url: &str, path: &Path) -> Result<FetchOutcome> {
        self.ensure_dir(&self.resolver.app_dir(app_id))?;
        Ok(self.fetcher.fetch(url, path)?)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        self.fs
            .ensure_dir(dir)
            .map_err(|source| SyncError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })
    }

    /// Local icon path when it has been downloaded.
    pub fn icon_path(&self, app_id: AppId) -> Option<PathBuf> {
        let path = self.resolver.local_path(app_id, AssetKind::Icon);
        self.fs.exists(&path).then_some(path)
    }

    pub fn achievement_icon_path(&self, app_id: AppId, achievement_id: &str) -> Option<PathBuf> {
        let path = self
            .resolver
            .local_path(app_id, AssetKind::AchievementIcon(achievement_id));
        self.fs.exists(&path).then_some(path)
    }

    /// Catalog entries the oracle reports as owned, sorted by name.
    pub fn owned_apps(&self, oracle: &dyn OwnershipOracle) -> Vec<(AppId, String)> {
        let mut owned: Vec<(AppId, String)> = self
            .store
            .iter()
            .filter(|(id, _)| oracle.is_owned(*id))
            .map(|(id, name)| (id, name.to_string()))
            .collect();
        owned.sort_by(|a, b| a.1.to_lowercase().cmp(&b.1.to_lowercase()).then(a.0.cmp(&b.0)));
        owned
    }

    /// Age of every catalog file used by the current strategy.
    pub fn catalog_ages(&self) -> Result<Vec<(CatalogSource, Option<CacheAge>)>> {
        self.strategy
            .sources()
            .into_iter()
            .map(|source| -> Result<(CatalogSource, Option<CacheAge>)> {
                let age = cache::cache_age(&self.resolver.catalog_path(source))?;
                Ok((source, age))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_sources() {
        assert_eq!(RetrievalStrategy::FullList.sources(), vec![CatalogSource::GameList]);
        assert_eq!(
            RetrievalStrategy::FilteredList.sources(),
            vec![CatalogSource::AppList, CatalogSource::NotGames]
        );
        assert_eq!(RetrievalStrategy::RawList.sources(), vec![CatalogSource::AppList]);
    }

    #[test]
    fn test_strategy_default_is_raw_list() {
        assert_eq!(RetrievalStrategy::default(), RetrievalStrategy::RawList);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "filtered-list".parse::<RetrievalStrategy>(),
            Ok(RetrievalStrategy::FilteredList)
        );
        assert_eq!("full_list".parse::<RetrievalStrategy>(), Ok(RetrievalStrategy::FullList));
        assert!("everything".parse::<RetrievalStrategy>().is_err());
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&RetrievalStrategy::FilteredList).expect("serialize");
        assert_eq!(json, "\"filtered_list\"");
        let parsed: RetrievalStrategy = serde_json::from_str("\"raw_list\"").expect("parse");
        assert_eq!(parsed, RetrievalStrategy::RawList);
    }
}
