//! Read-only projections of the board snapshot.

use std::cmp::Reverse;

use crate::{
    dto::{
        admin::{AdminDashboardResponse, AdminSelectionRow},
        board::{BoardResponse, ClubCard, LimitStatus},
        format_system_time,
    },
    state::{Participation, SharedState, session::SessionIdentity},
};

const UNKNOWN_CLUB: &str = "Unknown";

/// Club grid and limit figures as seen by `viewer`.
pub async fn board_for(state: &SharedState, viewer: Option<&SessionIdentity>) -> BoardResponse {
    let user_name = viewer.and_then(|identity| identity.user_name.clone());
    let bounds = state.config().limit_bounds();
    let degraded = state.is_degraded().await;

    state
        .read_board(|board| {
            let participation = Participation::derive(user_name.as_deref(), board);
            let can_select = participation.can_select();
            let clubs = board
                .clubs()
                .iter()
                .map(|club| ClubCard::project(club, board, user_name.as_deref(), can_select))
                .collect();

            BoardResponse {
                user_name: user_name.clone(),
                participation,
                clubs,
                limit: LimitStatus::project(board, &bounds),
                degraded,
            }
        })
        .await
}

/// Limit editor figures.
pub async fn limit_status(state: &SharedState) -> LimitStatus {
    let bounds = state.config().limit_bounds();
    state
        .read_board(|board| LimitStatus::project(board, &bounds))
        .await
}

/// Admin table: newest selections first, joined with the catalog.
pub async fn admin_dashboard(state: &SharedState) -> AdminDashboardResponse {
    let bounds = state.config().limit_bounds();

    state
        .read_board(|board| {
            let mut selections: Vec<_> = board.selections().iter().collect();
            selections.sort_by_key(|selection| Reverse(selection.selected_at));

            let rows = selections
                .into_iter()
                .map(|selection| {
                    let club = board.club(&selection.club_id);
                    AdminSelectionRow {
                        id: selection.id,
                        user_name: selection.user_name.clone(),
                        club_id: selection.club_id.clone(),
                        club_name: club
                            .map(|club| club.name.clone())
                            .unwrap_or_else(|| UNKNOWN_CLUB.to_string()),
                        league: club.map(|club| club.league.clone()).unwrap_or_default(),
                        selected_at: format_system_time(selection.selected_at),
                    }
                })
                .collect();

            AdminDashboardResponse {
                total_selections: board.selection_count(),
                available_clubs: board.available_clubs(),
                limit: LimitStatus::project(board, &bounds),
                selections: rows,
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::{
        dao::{models::SelectionEntity, selection_store::MemorySelectionStore},
        services::controller::{self, tests::booted},
    };

    #[tokio::test]
    async fn grid_marks_ownership_and_selectability() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 2).await;
        controller::select_club(&state, Some("Alice"), "a", true)
            .await
            .unwrap();

        let alice = SessionIdentity::named("Alice");
        let board = board_for(&state, Some(&alice)).await;
        let arsenal = board.clubs.iter().find(|c| c.id == "a").unwrap();
        assert!(arsenal.taken && arsenal.is_mine && !arsenal.selectable);
        assert_eq!(arsenal.selected_by.as_deref(), Some("Alice"));
        assert!(board.clubs.iter().all(|c| !c.selectable));

        let bob = SessionIdentity::named("Bob");
        let board = board_for(&state, Some(&bob)).await;
        let free: Vec<_> = board
            .clubs
            .iter()
            .filter(|c| c.selectable)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(free, vec!["b", "x"]);
        assert!(board.clubs.iter().all(|c| !c.is_mine));

        let anonymous = board_for(&state, None).await;
        assert_eq!(anonymous.participation, Participation::Anonymous);
        assert!(anonymous.clubs.iter().all(|c| !c.selectable));
    }

    #[tokio::test]
    async fn reaching_the_limit_disables_every_card() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 1).await;
        controller::select_club(&state, Some("Alice"), "a", true)
            .await
            .unwrap();

        let board = board_for(&state, Some(&SessionIdentity::named("Bob"))).await;
        assert!(board.limit.limit_reached);
        assert_eq!(board.limit.selection_count, 1);
        assert!(board.clubs.iter().all(|c| !c.selectable));
    }

    #[tokio::test]
    async fn admin_table_is_newest_first_with_unknown_clubs() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        let now = SystemTime::now();
        let mut older = SelectionEntity::new("Alice", "a");
        older.selected_at = now - Duration::from_secs(60);
        let mut newer = SelectionEntity::new("Ghost", "retired-club");
        newer.selected_at = now;
        state
            .with_board_mut(|board| board.replace_selections(vec![older, newer]))
            .await;

        let dashboard = admin_dashboard(&state).await;
        assert_eq!(dashboard.total_selections, 2);
        assert_eq!(dashboard.available_clubs, 2);
        assert_eq!(dashboard.selections[0].user_name, "Ghost");
        assert_eq!(dashboard.selections[0].club_name, "Unknown");
        assert_eq!(dashboard.selections[0].league, "");
        assert_eq!(dashboard.selections[1].club_name, "Arsenal");
        assert_eq!(dashboard.selections[1].league, "Premier League");
    }
}
