use serde::Serialize;
use utoipa::ToSchema;

use crate::state::board::ClubBoard;

/// Where a single user stands in the selection flow.
///
/// The phase is derived from the session identity and the current board rather than stored, so
/// an admin removing a user's pick moves that user back to [`Participation::Selecting`] as soon as
/// the selections are re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Participation {
    /// No display name known for this session.
    Anonymous,
    /// Name known but the catalog has not been loaded yet.
    Named,
    /// Name known, catalog loaded, no selection yet.
    Selecting,
    /// A selection has been committed for this name.
    Locked {
        /// Club owned by the user.
        club_id: String,
    },
}

impl Participation {
    /// Compute the phase of `user_name` against `board`.
    pub fn derive(user_name: Option<&str>, board: &ClubBoard) -> Self {
        let Some(name) = user_name.filter(|name| !name.trim().is_empty()) else {
            return Participation::Anonymous;
        };

        if let Some(selection) = board.selection_for_user(name) {
            return Participation::Locked {
                club_id: selection.club_id.clone(),
            };
        }

        if board.catalog_loaded() {
            Participation::Selecting
        } else {
            Participation::Named
        }
    }

    /// Whether the user may attempt a pick.
    pub fn can_select(&self) -> bool {
        matches!(self, Participation::Selecting)
    }

    /// Club owned by the user, when locked.
    pub fn club_id(&self) -> Option<&str> {
        match self {
            Participation::Locked { club_id } => Some(club_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{ClubEntity, SelectionEntity};

    fn loaded_board() -> ClubBoard {
        let mut board = ClubBoard::new(11);
        board.replace_clubs(vec![ClubEntity {
            id: "ars".into(),
            name: "Arsenal".into(),
            league: "Premier League".into(),
            logo_url: String::new(),
        }]);
        board
    }

    #[test]
    fn blank_name_is_anonymous() {
        let board = loaded_board();
        assert_eq!(Participation::derive(None, &board), Participation::Anonymous);
        assert_eq!(
            Participation::derive(Some("   "), &board),
            Participation::Anonymous
        );
    }

    #[test]
    fn named_until_catalog_loads() {
        let mut board = ClubBoard::new(11);
        assert_eq!(
            Participation::derive(Some("alice"), &board),
            Participation::Named
        );

        board.replace_clubs(Vec::new());
        assert_eq!(
            Participation::derive(Some("alice"), &board),
            Participation::Selecting
        );
    }

    #[test]
    fn committed_selection_locks_the_user() {
        let mut board = loaded_board();
        board.replace_selections(vec![SelectionEntity::new("alice", "ars")]);

        let phase = Participation::derive(Some("alice"), &board);
        assert_eq!(phase.club_id(), Some("ars"));
        assert!(!phase.can_select());
        assert!(Participation::derive(Some("bob"), &board).can_select());
    }

    #[test]
    fn removed_selection_unlocks_the_user() {
        let mut board = loaded_board();
        board.replace_selections(vec![SelectionEntity::new("alice", "ars")]);
        board.replace_selections(Vec::new());

        assert_eq!(
            Participation::derive(Some("alice"), &board),
            Participation::Selecting
        );
    }
}
