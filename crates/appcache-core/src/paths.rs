//! Deterministic mapping from assets to local cache paths and remote URLs.
//!
//! Layout under the cache root:
//! - `app_names`, `game_list.json`, `not_games.json`: raw catalog documents
//! - `<app_id>/header.jpg`: application icon
//! - `<app_id>/<achievement_id>`: achievement icon

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::AppId;

// ============================================================================
// Constants
// ============================================================================

/// Steam's full application list (games and everything else)
const APP_LIST_URL: &str = "http://api.steampowered.com/ISteamApps/GetAppList/v0002/";

/// Community dump of games that carry achievements
const GAME_LIST_URL: &str =
    "https://raw.githubusercontent.com/PaulCombal/SteamAppsListDumps/master/game_achievements_list.json";

/// Community dump of app ids that are not games
const NOT_GAMES_URL: &str =
    "https://raw.githubusercontent.com/PaulCombal/SteamAppsListDumps/master/not_games.json";

const ICON_BASE_URL: &str = "http://cdn.akamai.steamstatic.com/steam/apps";

const ACHIEVEMENT_ICON_BASE_URL: &str =
    "http://media.steamcommunity.com/steamcommunity/public/images/apps";

/// Remote name of the application header image
const REMOTE_ICON_NAME: &str = "header_292x136.jpg";

/// Local name of the application header image
pub const ICON_FILE_NAME: &str = "header.jpg";

/// A raw catalog document kept directly under the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Every app id Steam knows about, junk included
    AppList,
    /// Curated list of games only
    GameList,
    /// App ids to prune from `AppList`
    NotGames,
}

impl CatalogSource {
    pub fn file_name(self) -> &'static str {
        match self {
            CatalogSource::AppList => "app_names",
            CatalogSource::GameList => "game_list.json",
            CatalogSource::NotGames => "not_games.json",
        }
    }
}

/// What kind of asset a path or URL is derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind<'a> {
    CatalogList(CatalogSource),
    Icon,
    /// Carries the achievement id locally, or the remote file name for URLs.
    AchievementIcon(&'a str),
}

/// Base URLs used to build remote locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub app_list: String,
    pub game_list: String,
    pub not_games: String,
    pub icon_base: String,
    pub achievement_icon_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            app_list: APP_LIST_URL.to_string(),
            game_list: GAME_LIST_URL.to_string(),
            not_games: NOT_GAMES_URL.to_string(),
            icon_base: ICON_BASE_URL.to_string(),
            achievement_icon_base: ACHIEVEMENT_ICON_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Serve every asset from a single host, mirroring the default path layout.
    /// Used to point the cache at a mirror or a test server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            app_list: format!("{}/ISteamApps/GetAppList/v0002/", base),
            game_list: format!("{}/game_achievements_list.json", base),
            not_games: format!("{}/not_games.json", base),
            icon_base: format!("{}/steam/apps", base),
            achievement_icon_base: format!("{}/images/apps", base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    cache_root: PathBuf,
    endpoints: Endpoints,
}

impl PathResolver {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self::with_endpoints(cache_root, Endpoints::default())
    }

    pub fn with_endpoints(cache_root: impl Into<PathBuf>, endpoints: Endpoints) -> Self {
        Self {
            cache_root: cache_root.into(),
            endpoints,
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Directory holding every asset of one application
    pub fn app_dir(&self, app_id: AppId) -> PathBuf {
        self.cache_root.join(app_id.to_string())
    }

    pub fn local_path(&self, app_id: AppId, kind: AssetKind<'_>) -> PathBuf {
        match kind {
            AssetKind::CatalogList(source) => self.cache_root.join(source.file_name()),
            AssetKind::Icon => self.app_dir(app_id).join(ICON_FILE_NAME),
            AssetKind::AchievementIcon(achievement_id) => {
                self.app_dir(app_id).join(sanitize_file_name(achievement_id))
            }
        }
    }

    pub fn catalog_path(&self, source: CatalogSource) -> PathBuf {
        self.local_path(0, AssetKind::CatalogList(source))
    }

    pub fn catalog_url(&self, source: CatalogSource) -> String {
        self.remote_url(0, AssetKind::CatalogList(source))
    }

    pub fn remote_url(&self, app_id: AppId, kind: AssetKind<'_>) -> String {
        match kind {
            AssetKind::CatalogList(CatalogSource::AppList) => self.endpoints.app_list.clone(),
            AssetKind::CatalogList(CatalogSource::GameList) => self.endpoints.game_list.clone(),
            AssetKind::CatalogList(CatalogSource::NotGames) => self.endpoints.not_games.clone(),
            AssetKind::Icon => format!("{}/{}/{}", self.endpoints.icon_base, app_id, REMOTE_ICON_NAME),
            AssetKind::AchievementIcon(remote_name) => format!(
                "{}/{}/{}",
                self.endpoints.achievement_icon_base, app_id, remote_name
            ),
        }
    }
}

/// Keep an identifier inside its entity directory.
fn sanitize_file_name(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}
