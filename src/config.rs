//! Application-level configuration loading: player limit bounds, admin credential and club catalog.

use std::{env, fs, io::ErrorKind, ops::RangeInclusive, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::ClubEntity;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLUB_PICK_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured admin credential.
const ADMIN_PASSWORD_ENV: &str = "CLUB_PICK_ADMIN_PASSWORD";
/// Player limit used when the config row is created for the first time.
pub const DEFAULT_PLAYER_LIMIT: u32 = 11;
const DEFAULT_MIN_PLAYER_LIMIT: u32 = 1;
const DEFAULT_MAX_PLAYER_LIMIT: u32 = 100;
const DEFAULT_SESSION_FILE: &str = "data/sessions.json";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_player_limit: u32,
    limit_bounds: RangeInclusive<u32>,
    clubs: Vec<ClubEntity>,
    admin_password: Option<String>,
    session_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        clubs = app_config.clubs.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(password) = env::var(ADMIN_PASSWORD_ENV)
            .ok()
            .filter(|value| !value.is_empty())
        {
            self.admin_password = Some(password);
        }
        if self.admin_password.is_none() {
            warn!("no admin credential configured; admin login is disabled");
        }
        self
    }

    /// Set the admin credential.
    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = Some(password.into());
        self
    }

    /// Set the limit written when the config row is first created, clamped to the bounds.
    pub fn with_default_player_limit(mut self, limit: u32) -> Self {
        self.default_player_limit =
            limit.clamp(*self.limit_bounds.start(), *self.limit_bounds.end());
        self
    }

    /// Replace the club catalog seeded into the store.
    pub fn with_clubs(mut self, clubs: Vec<ClubEntity>) -> Self {
        self.clubs = clubs;
        self
    }

    /// Set the file where session identities are persisted (`None` keeps them in memory).
    pub fn with_session_file(mut self, path: Option<PathBuf>) -> Self {
        self.session_file = path;
        self
    }

    /// Limit written when the config row does not exist yet.
    pub fn default_player_limit(&self) -> u32 {
        self.default_player_limit
    }

    /// Inclusive range accepted by the limit editor.
    pub fn limit_bounds(&self) -> RangeInclusive<u32> {
        self.limit_bounds.clone()
    }

    /// Catalog seeded into the store on startup.
    pub fn clubs(&self) -> &[ClubEntity] {
        &self.clubs
    }

    /// Configured admin credential, if any.
    pub fn admin_password(&self) -> Option<&str> {
        self.admin_password.as_deref()
    }

    /// File where session identities are persisted.
    pub fn session_file(&self) -> Option<&PathBuf> {
        self.session_file.as_ref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_player_limit: DEFAULT_PLAYER_LIMIT,
            limit_bounds: DEFAULT_MIN_PLAYER_LIMIT..=DEFAULT_MAX_PLAYER_LIMIT,
            clubs: default_clubs(),
            admin_password: None,
            session_file: Some(PathBuf::from(DEFAULT_SESSION_FILE)),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_player_limit: Option<u32>,
    #[serde(default)]
    min_player_limit: Option<u32>,
    #[serde(default)]
    max_player_limit: Option<u32>,
    #[serde(default)]
    clubs: Option<Vec<RawClub>>,
    #[serde(default)]
    admin_password: Option<String>,
    #[serde(default)]
    session_file: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        // Zero is never a valid limit.
        let min = value
            .min_player_limit
            .unwrap_or(DEFAULT_MIN_PLAYER_LIMIT)
            .max(1);
        let max = value
            .max_player_limit
            .unwrap_or(DEFAULT_MAX_PLAYER_LIMIT)
            .max(min);
        let default_player_limit = value
            .default_player_limit
            .unwrap_or(DEFAULT_PLAYER_LIMIT)
            .clamp(min, max);

        Self {
            default_player_limit,
            limit_bounds: min..=max,
            clubs: value
                .clubs
                .map(|clubs| clubs.into_iter().map(Into::into).collect())
                .unwrap_or(defaults.clubs),
            admin_password: value.admin_password.filter(|p| !p.is_empty()),
            session_file: match value.session_file {
                Some(path) if path.is_empty() => None,
                Some(path) => Some(PathBuf::from(path)),
                None => defaults.session_file,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single catalog entry inside the configuration file.
struct RawClub {
    id: String,
    name: String,
    league: String,
    #[serde(default)]
    logo_url: Option<String>,
}

impl From<RawClub> for ClubEntity {
    fn from(value: RawClub) -> Self {
        let logo_url = value
            .logo_url
            .unwrap_or_else(|| format!("/logos/{}.png", value.id));
        Self {
            id: value.id,
            name: value.name,
            league: value.league,
            logo_url,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in catalog shipped with the binary.
fn default_clubs() -> Vec<ClubEntity> {
    [
        ("arsenal", "Arsenal", "Premier League"),
        ("chelsea", "Chelsea", "Premier League"),
        ("liverpool", "Liverpool", "Premier League"),
        ("man-city", "Manchester City", "Premier League"),
        ("man-utd", "Manchester United", "Premier League"),
        ("tottenham", "Tottenham Hotspur", "Premier League"),
        ("barcelona", "FC Barcelona", "La Liga"),
        ("real-madrid", "Real Madrid", "La Liga"),
        ("atletico", "Atletico Madrid", "La Liga"),
        ("bayern", "Bayern Munich", "Bundesliga"),
        ("dortmund", "Borussia Dortmund", "Bundesliga"),
        ("leverkusen", "Bayer Leverkusen", "Bundesliga"),
        ("juventus", "Juventus", "Serie A"),
        ("inter", "Inter Milan", "Serie A"),
        ("milan", "AC Milan", "Serie A"),
        ("napoli", "Napoli", "Serie A"),
        ("psg", "Paris Saint-Germain", "Ligue 1"),
        ("marseille", "Olympique de Marseille", "Ligue 1"),
        ("benfica", "Benfica", "Primeira Liga"),
        ("porto", "FC Porto", "Primeira Liga"),
    ]
    .into_iter()
    .map(|(id, name, league)| ClubEntity {
        id: id.to_string(),
        name: name.to_string(),
        league: league.to_string(),
        logo_url: format!("/logos/{id}.png"),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_clamps_limits() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "default_player_limit": 500, "min_player_limit": 0, "max_player_limit": 40 }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.limit_bounds(), 1..=40);
        assert_eq!(config.default_player_limit(), 40);
        assert_eq!(config.clubs().len(), default_clubs().len());
    }

    #[test]
    fn raw_config_reads_catalog_and_credential() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "admin_password": "secret",
                "session_file": "",
                "clubs": [{ "id": "ajax", "name": "Ajax", "league": "Eredivisie" }]
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.admin_password(), Some("secret"));
        assert!(config.session_file().is_none());
        assert_eq!(config.clubs()[0].logo_url, "/logos/ajax.png");
        assert_eq!(config.default_player_limit(), DEFAULT_PLAYER_LIMIT);
    }

    #[test]
    fn default_catalog_ids_are_unique() {
        let clubs = default_clubs();
        let mut ids: Vec<&str> = clubs.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), clubs.len());
    }
}
