use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    CONFIG_COLLECTION_NAME, SELECTION_COLLECTION_NAME,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::models::{ClubEntity, GameConfigEntity, SelectionEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoClubDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    league: String,
    logo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSelectionDocument {
    #[serde(rename = "_id")]
    id: String,
    user_name: String,
    club_id: String,
    selected_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfigDocument {
    #[serde(rename = "_id")]
    id: String,
    player_limit: i64,
    updated_at: DateTime,
}

impl From<ClubEntity> for MongoClubDocument {
    fn from(value: ClubEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            league: value.league,
            logo_url: value.logo_url,
        }
    }
}

impl From<MongoClubDocument> for ClubEntity {
    fn from(value: MongoClubDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            league: value.league,
            logo_url: value.logo_url,
        }
    }
}

impl From<SelectionEntity> for MongoSelectionDocument {
    fn from(value: SelectionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            user_name: value.user_name,
            club_id: value.club_id,
            selected_at: DateTime::from_system_time(value.selected_at),
        }
    }
}

impl TryFrom<MongoSelectionDocument> for SelectionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSelectionDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(SELECTION_COLLECTION_NAME, &value.id)?,
            user_name: value.user_name,
            club_id: value.club_id,
            selected_at: value.selected_at.to_system_time(),
        })
    }
}

/// Constant field carried by the config row; its unique index keeps `game_config` to one row.
pub const CONFIG_SINGLETON_FIELD: &str = "singleton";

/// Filter matching the config row.
pub fn config_singleton_filter() -> Document {
    doc! { CONFIG_SINGLETON_FIELD: true }
}

/// Upsert body that writes `config` only when no config row exists yet.
///
/// Paired with [`config_singleton_filter`], the filter's equality field lands in the inserted row.
pub fn config_insert_if_absent(config: &GameConfigEntity) -> Document {
    doc! {
        "$setOnInsert": {
            "_id": config.id.to_string(),
            "player_limit": i64::from(config.player_limit),
            "updated_at": DateTime::from_system_time(config.updated_at),
        }
    }
}

impl TryFrom<MongoConfigDocument> for GameConfigEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoConfigDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(CONFIG_COLLECTION_NAME, &value.id)?,
            // Out-of-range values written by other tools clamp to the nearest valid limit.
            player_limit: u32::try_from(value.player_limit.max(1)).unwrap_or(u32::MAX),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

fn parse_id(collection: &'static str, value: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(value).map_err(|source| MongoDaoError::InvalidId {
        collection,
        value: value.to_owned(),
        source,
    })
}

pub fn doc_id(id: impl ToString) -> Document {
    doc! {"_id": id.to_string()}
}
