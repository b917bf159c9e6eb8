//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::board::LimitStatus;

/// Credential submitted to the admin gate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub password: String,
}

/// New player limit requested from the limit editor.
///
/// Signed so that zero and negative inputs reach the bounds check instead of failing to parse.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLimitRequest {
    pub player_limit: i64,
}

/// One line of the admin selections table.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSelectionRow {
    pub id: Uuid,
    pub user_name: String,
    pub club_id: String,
    /// Club name, or `"Unknown"` when the club is missing from the catalog.
    pub club_name: String,
    /// League label, empty when the club is missing from the catalog.
    pub league: String,
    pub selected_at: String,
}

/// Admin table with totals, newest selections first.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboardResponse {
    pub total_selections: usize,
    pub available_clubs: usize,
    pub limit: LimitStatus,
    pub selections: Vec<AdminSelectionRow>,
}
