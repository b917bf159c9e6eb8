//! Projections of the board snapshot served to the club grid and limit editor.

use std::ops::RangeInclusive;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::ClubEntity,
    dto::format_system_time,
    state::{Participation, board::ClubBoard},
};

/// One card of the club grid, seen from a given viewer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClubCard {
    pub id: String,
    pub name: String,
    pub league: String,
    pub logo_url: String,
    /// Another selection (or the viewer's own) holds this club.
    pub taken: bool,
    /// Display name of the owner, when taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_by: Option<String>,
    /// The viewer owns this club.
    pub is_mine: bool,
    /// The viewer may pick this club right now.
    pub selectable: bool,
}

impl ClubCard {
    pub(crate) fn project(
        club: &ClubEntity,
        board: &ClubBoard,
        viewer: Option<&str>,
        viewer_can_select: bool,
    ) -> Self {
        let owner = board
            .selection_for_club(&club.id)
            .map(|selection| selection.user_name.clone());
        let taken = owner.is_some();
        let is_mine = viewer.is_some() && owner.as_deref() == viewer;

        Self {
            id: club.id.clone(),
            name: club.name.clone(),
            league: club.league.clone(),
            logo_url: club.logo_url.clone(),
            taken,
            selected_by: owner,
            is_mine,
            selectable: viewer_can_select && !taken && !board.limit_reached(),
        }
    }
}

/// Figures shown by the limit editor and the player counter.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LimitStatus {
    pub selection_count: usize,
    pub player_limit: u32,
    pub min_limit: u32,
    pub max_limit: u32,
    pub limit_reached: bool,
    /// Last time an admin changed the limit, when the config row is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl LimitStatus {
    pub(crate) fn project(board: &ClubBoard, bounds: &RangeInclusive<u32>) -> Self {
        Self {
            selection_count: board.selection_count(),
            player_limit: board.player_limit(),
            min_limit: *bounds.start(),
            max_limit: *bounds.end(),
            limit_reached: board.limit_reached(),
            updated_at: board
                .config()
                .map(|config| format_system_time(config.updated_at)),
        }
    }
}

/// Everything a participant screen renders.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoardResponse {
    /// Display name of the viewer, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub participation: Participation,
    pub clubs: Vec<ClubCard>,
    pub limit: LimitStatus,
    /// Whether the backend currently runs without a store.
    pub degraded: bool,
}
