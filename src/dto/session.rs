use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::SelectionEntity,
    dto::{format_system_time, validation::validate_display_name},
    state::Participation,
};

/// Header carrying the session id returned by `POST /sessions`.
pub const SESSION_HEADER: &str = "x-session-id";

/// Name-entry form payload, used both to open a session and to rename it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DisplayNameRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
}

/// Current identity and phase of a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub is_admin: bool,
    pub participation: Participation,
}

/// Request to claim a club.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectClubRequest {
    pub club_id: String,
    /// The user confirmed the irreversible pick.
    #[serde(default)]
    pub confirm: bool,
}

/// Committed selection as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelectionSummary {
    pub id: Uuid,
    pub user_name: String,
    pub club_id: String,
    pub selected_at: String,
}

impl From<&SelectionEntity> for SelectionSummary {
    fn from(value: &SelectionEntity) -> Self {
        Self {
            id: value.id,
            user_name: value.user_name.clone(),
            club_id: value.club_id.clone(),
            selected_at: format_system_time(value.selected_at),
        }
    }
}

impl From<SelectionEntity> for SelectionSummary {
    fn from(value: SelectionEntity) -> Self {
        (&value).into()
    }
}
