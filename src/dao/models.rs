use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Selectable football club from the read-only catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClubEntity {
    /// Stable catalog identifier (e.g. `"arsenal"`).
    pub id: String,
    /// Display name, also the catalog sort key.
    pub name: String,
    /// League label shown next to the club.
    pub league: String,
    /// URL of the club crest.
    pub logo_url: String,
}

/// A user's claim on a club.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionEntity {
    /// Primary key of the selection.
    pub id: Uuid,
    /// Display name of the user who made the pick. Unique across selections.
    pub user_name: String,
    /// Identifier of the claimed club. Unique across selections.
    pub club_id: String,
    /// When the pick was committed.
    pub selected_at: SystemTime,
}

/// Singleton configuration row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfigEntity {
    /// Primary key of the config row.
    pub id: Uuid,
    /// Maximum number of selections allowed.
    pub player_limit: u32,
    /// Last time the limit was changed.
    pub updated_at: SystemTime,
}

impl SelectionEntity {
    /// Build a fresh selection stamped with the current time.
    pub fn new(user_name: impl Into<String>, club_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_name: user_name.into(),
            club_id: club_id.into(),
            selected_at: SystemTime::now(),
        }
    }
}

impl GameConfigEntity {
    /// Build a fresh config row holding `player_limit`.
    pub fn new(player_limit: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_limit,
            updated_at: SystemTime::now(),
        }
    }
}
