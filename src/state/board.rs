//! Owned snapshot of the catalog, the selections and the config row.
//!
//! Every mutation replaces a whole collection with the result of a fresh fetch; nothing is patched
//! incrementally, so the snapshot can never drift from what the store last returned.

use uuid::Uuid;

use crate::dao::models::{ClubEntity, GameConfigEntity, SelectionEntity};

/// Local view over the three external collections.
#[derive(Debug, Clone)]
pub struct ClubBoard {
    clubs: Vec<ClubEntity>,
    selections: Vec<SelectionEntity>,
    config: Option<GameConfigEntity>,
    default_limit: u32,
    catalog_loaded: bool,
}

impl ClubBoard {
    /// Empty board reporting `default_limit` until a config row is loaded.
    pub fn new(default_limit: u32) -> Self {
        Self {
            clubs: Vec::new(),
            selections: Vec::new(),
            config: None,
            default_limit,
            catalog_loaded: false,
        }
    }

    /// Replace the catalog and mark it loaded.
    pub fn replace_clubs(&mut self, clubs: Vec<ClubEntity>) {
        self.clubs = clubs;
        self.catalog_loaded = true;
    }

    /// Replace every selection with a fresh fetch.
    pub fn replace_selections(&mut self, selections: Vec<SelectionEntity>) {
        self.selections = selections;
    }

    /// Replace the config row.
    pub fn replace_config(&mut self, config: GameConfigEntity) {
        self.config = Some(config);
    }

    /// Catalog in store order (by name).
    pub fn clubs(&self) -> &[ClubEntity] {
        &self.clubs
    }

    /// Committed selections.
    pub fn selections(&self) -> &[SelectionEntity] {
        &self.selections
    }

    /// Config row, once loaded.
    pub fn config(&self) -> Option<&GameConfigEntity> {
        self.config.as_ref()
    }

    /// Identifier of the config row, once known.
    pub fn config_id(&self) -> Option<Uuid> {
        self.config.as_ref().map(|config| config.id)
    }

    /// Whether the catalog has been fetched at least once.
    pub fn catalog_loaded(&self) -> bool {
        self.catalog_loaded
    }

    /// Current player limit, or the default before the config row is loaded.
    pub fn player_limit(&self) -> u32 {
        self.config
            .as_ref()
            .map(|config| config.player_limit)
            .unwrap_or(self.default_limit)
    }

    /// Number of committed selections.
    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    /// Whether new picks must be refused. Advisory only: the store does not enforce it.
    pub fn limit_reached(&self) -> bool {
        self.selection_count() >= self.player_limit() as usize
    }

    /// Clubs with no selection pointing at them.
    pub fn available_clubs(&self) -> usize {
        self.clubs
            .iter()
            .filter(|club| self.selection_for_club(&club.id).is_none())
            .count()
    }

    /// Catalog entry for `club_id`.
    pub fn club(&self, club_id: &str) -> Option<&ClubEntity> {
        self.clubs.iter().find(|club| club.id == club_id)
    }

    /// Selection held by `user_name`, if any.
    pub fn selection_for_user(&self, user_name: &str) -> Option<&SelectionEntity> {
        self.selections.iter().find(|s| s.user_name == user_name)
    }

    /// Selection that claimed `club_id`, if any.
    pub fn selection_for_club(&self, club_id: &str) -> Option<&SelectionEntity> {
        self.selections.iter().find(|s| s.club_id == club_id)
    }
}
