//! Keeps the shared board snapshot in step with the external store and guards every write.
//!
//! Every successful write and every change notification ends in a full re-fetch of the affected
//! table, which then replaces the local copy wholesale. Preconditions are checked against the
//! local snapshot before the store is contacted.

use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameConfigEntity, SelectionEntity},
        selection_store::StoreTable,
        storage::UniqueField,
    },
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Seed the configured catalog into the store, then load every table.
pub async fn bootstrap(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let clubs = state.config().clubs().to_vec();
    if !clubs.is_empty() {
        let count = clubs.len();
        store.seed_clubs(clubs).await?;
        info!(count, "club catalog seeded");
    }
    load_all(state).await
}

/// Fetch clubs, selections and config concurrently, creating the config row when missing.
///
/// Fetch failures are logged and leave the affected part of the board untouched.
pub async fn load_all(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let (clubs, selections, config) = tokio::join!(
        store.list_clubs(),
        store.list_selections(),
        store.get_config()
    );

    match clubs {
        Ok(clubs) => {
            let count = clubs.len();
            state.with_board_mut(|board| board.replace_clubs(clubs)).await;
            debug!(count, "clubs loaded");
        }
        Err(err) => warn!(error = %err, "failed to load clubs"),
    }

    match selections {
        Ok(selections) => {
            state
                .with_board_mut(|board| board.replace_selections(selections))
                .await;
        }
        Err(err) => warn!(error = %err, "failed to load selections"),
    }

    let config = match config {
        Ok(Some(config)) => Some(config),
        Ok(None) => {
            let limit = state.config().default_player_limit();
            // Another instance may win the race; its row is returned instead.
            match store.create_config(limit).await {
                Ok(config) => {
                    info!(id = %config.id, player_limit = config.player_limit, "game config ready");
                    Some(config)
                }
                Err(err) => {
                    warn!(error = %err, "failed to create game config");
                    None
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "failed to load game config");
            None
        }
    };
    if let Some(config) = config {
        state
            .with_board_mut(|board| board.replace_config(config))
            .await;
    }

    sse_events::broadcast_selections(state).await;
    sse_events::broadcast_config(state).await;
    Ok(())
}

/// Re-fetch the table named by a change notification.
pub async fn refresh(state: &SharedState, table: StoreTable) {
    match table {
        StoreTable::Selections => refresh_selections(state).await,
        StoreTable::Config => refresh_config(state).await,
    }
}

/// Replace the local selections with the store's current contents.
pub async fn refresh_selections(state: &SharedState) {
    let Some(store) = state.store().await else {
        debug!("skipping selections refresh in degraded mode");
        return;
    };

    match store.list_selections().await {
        Ok(selections) => {
            let count = selections.len();
            state
                .with_board_mut(|board| board.replace_selections(selections))
                .await;
            debug!(count, "selections refreshed");
            sse_events::broadcast_selections(state).await;
        }
        Err(err) => warn!(error = %err, "failed to re-fetch selections; keeping previous snapshot"),
    }
}

/// Replace the local config row with the store's current contents.
pub async fn refresh_config(state: &SharedState) {
    let Some(store) = state.store().await else {
        debug!("skipping config refresh in degraded mode");
        return;
    };

    match store.get_config().await {
        Ok(Some(config)) => {
            let player_limit = config.player_limit;
            state
                .with_board_mut(|board| board.replace_config(config))
                .await;
            debug!(player_limit, "config refreshed");
            sse_events::broadcast_config(state).await;
        }
        Ok(None) => warn!("game config row is missing; keeping previous snapshot"),
        Err(err) => warn!(error = %err, "failed to re-fetch config; keeping previous snapshot"),
    }
}

/// Claim `club_id` for `user_name`.
///
/// Checked locally, in order: a name is known, the user has no selection yet, the pick was
/// confirmed, the limit is not reached, the club exists and is not shown as taken. The store
/// remains the arbiter for concurrent picks; its uniqueness violations are reported as
/// [`ServiceError::ClubTaken`] or [`ServiceError::AlreadySelected`] and never retried.
pub async fn select_club(
    state: &SharedState,
    user_name: Option<&str>,
    club_id: &str,
    confirmed: bool,
) -> Result<SelectionEntity, ServiceError> {
    let user_name = user_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ServiceError::InvalidInput("a display name is required before selecting a club".into())
        })?
        .to_string();

    state
        .read_board(|board| {
            if board.selection_for_user(&user_name).is_some() {
                return Err(ServiceError::AlreadySelected {
                    user_name: user_name.clone(),
                });
            }
            if !confirmed {
                return Err(ServiceError::InvalidInput(
                    "the selection must be confirmed; it cannot be changed afterwards".into(),
                ));
            }
            if board.limit_reached() {
                return Err(ServiceError::InvalidState(
                    "Player limit reached! Cannot select more clubs.".into(),
                ));
            }
            if board.club(club_id).is_none() {
                return Err(ServiceError::NotFound(format!("club `{club_id}`")));
            }
            if board.selection_for_club(club_id).is_some() {
                return Err(ServiceError::ClubTaken {
                    club_id: club_id.to_string(),
                });
            }
            Ok(())
        })
        .await?;

    let store = state.require_store().await?;
    match store
        .insert_selection(user_name.clone(), club_id.to_string())
        .await
    {
        Ok(selection) => {
            info!(user = %selection.user_name, club_id = %selection.club_id, "club selected");
            refresh_selections(state).await;
            Ok(selection)
        }
        Err(err) => match err.unique_field() {
            Some(UniqueField::ClubId) => {
                info!(user = %user_name, club_id, "club already taken in store");
                Err(ServiceError::ClubTaken {
                    club_id: club_id.to_string(),
                })
            }
            Some(UniqueField::UserName) => {
                info!(user = %user_name, "user already holds a selection in store");
                Err(ServiceError::AlreadySelected { user_name })
            }
            None => Err(ServiceError::WriteFailed(err)),
        },
    }
}

/// Change the player limit.
///
/// Rejected without contacting the store when the value is outside the configured bounds,
/// equals the current limit, or when the config row has not been loaded.
pub async fn update_limit(
    state: &SharedState,
    new_limit: i64,
) -> Result<GameConfigEntity, ServiceError> {
    let bounds = state.config().limit_bounds();
    let limit = u32::try_from(new_limit)
        .ok()
        .filter(|limit| bounds.contains(limit))
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "player limit must be between {} and {}",
                bounds.start(),
                bounds.end()
            ))
        })?;

    let (config_id, current) = state
        .read_board(|board| (board.config_id(), board.player_limit()))
        .await;
    if limit == current {
        return Err(ServiceError::InvalidInput(format!(
            "player limit is already {limit}"
        )));
    }
    let config_id = config_id
        .ok_or_else(|| ServiceError::InvalidState("game config has not been loaded yet".into()))?;

    let store = state.require_store().await?;
    let updated_at = SystemTime::now();
    store.update_config(config_id, limit, updated_at).await?;
    info!(previous = current, player_limit = limit, "player limit updated");

    refresh_config(state).await;
    Ok(GameConfigEntity {
        id: config_id,
        player_limit: limit,
        updated_at,
    })
}

/// Remove a selection, freeing both the club and the user's slot.
pub async fn delete_selection(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    if !store.delete_selection(id).await? {
        return Err(ServiceError::NotFound(format!("selection `{id}`")));
    }
    info!(%id, "selection removed");

    refresh_selections(state).await;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::ClubEntity,
            selection_store::{MemorySelectionStore, SelectionStore},
        },
        state::{AppState, SessionRegistry},
    };

    pub(crate) fn club(id: &str, name: &str) -> ClubEntity {
        ClubEntity {
            id: id.into(),
            name: name.into(),
            league: "Premier League".into(),
            logo_url: format!("/logos/{id}.png"),
        }
    }

    pub(crate) fn test_config(limit: u32) -> AppConfig {
        AppConfig::default()
            .with_clubs(vec![
                club("a", "Arsenal"),
                club("b", "Brentford"),
                club("x", "Chelsea"),
            ])
            .with_session_file(None)
            .with_admin_password("letmein")
            .with_default_player_limit(limit)
    }

    /// Bootstrapped state backed by `store`.
    pub(crate) async fn booted(store: &MemorySelectionStore, limit: u32) -> SharedState {
        let state = AppState::new(test_config(limit), SessionRegistry::in_memory());
        state.install_store(Arc::new(store.clone())).await;
        bootstrap(&state).await.unwrap();
        state
    }

    #[tokio::test]
    async fn load_all_creates_missing_config() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;

        let config = store.get_config().await.unwrap().unwrap();
        assert_eq!(config.player_limit, 11);
        assert_eq!(state.read_board(|b| b.config_id()).await, Some(config.id));
        assert_eq!(state.read_board(|b| b.clubs().len()).await, 3);
    }

    #[tokio::test]
    async fn second_instance_reuses_existing_config() {
        let store = MemorySelectionStore::new();
        let first = booted(&store, 4).await;
        let second = booted(&store, 9).await;

        let first_id = first.read_board(|b| b.config_id()).await;
        assert_eq!(second.read_board(|b| b.config_id()).await, first_id);
        assert_eq!(second.read_board(|b| b.player_limit()).await, 4);
    }

    #[tokio::test]
    async fn concurrent_bootstraps_share_one_config() {
        let store = MemorySelectionStore::new();
        let (first, second) = tokio::join!(booted(&store, 4), booted(&store, 9));

        let config = store.get_config().await.unwrap().unwrap();
        assert_eq!(first.read_board(|b| b.config_id()).await, Some(config.id));
        assert_eq!(second.read_board(|b| b.config_id()).await, Some(config.id));
        assert_eq!(
            first.read_board(|b| b.player_limit()).await,
            second.read_board(|b| b.player_limit()).await
        );
    }

    #[tokio::test]
    async fn alice_then_bob_with_limit_one() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 1).await;

        let selection = select_club(&state, Some("Alice"), "a", true).await.unwrap();
        assert_eq!(selection.club_id, "a");
        let mine = state
            .read_board(|b| b.selection_for_user("Alice").map(|s| s.club_id.clone()))
            .await;
        assert_eq!(mine.as_deref(), Some("a"));

        let before = store.request_count();
        let err = select_club(&state, Some("Bob"), "b", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(ref m) if m.contains("limit reached")));
        assert_eq!(store.request_count(), before);
        assert_eq!(store.list_selections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn carol_and_dave_race_for_the_same_club() {
        // Two independent sessions with their own snapshots, sharing one store.
        let store = MemorySelectionStore::new();
        let carol_view = booted(&store, 11).await;
        let dave_view = booted(&store, 11).await;

        let (carol, dave) = tokio::join!(
            select_club(&carol_view, Some("Carol"), "x", true),
            select_club(&dave_view, Some("Dave"), "x", true),
        );

        let outcomes = [carol, dave];
        let winners = outcomes.iter().filter(|result| result.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(outcomes.iter().any(|result| matches!(
            result,
            Err(ServiceError::ClubTaken { club_id }) if club_id == "x"
        )));

        let rows: Vec<_> = store
            .list_selections()
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.club_id == "x")
            .collect();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn second_pick_is_blocked_locally() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        select_club(&state, Some("Alice"), "a", true).await.unwrap();

        let before = store.request_count();
        let err = select_club(&state, Some("Alice"), "b", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadySelected { .. }));
        assert_eq!(store.request_count(), before);
    }

    #[tokio::test]
    async fn stale_snapshot_still_gets_one_selection_per_user() {
        let store = MemorySelectionStore::new();
        let first = booted(&store, 11).await;
        let second = booted(&store, 11).await;

        select_club(&first, Some("Alice"), "a", true).await.unwrap();
        // `second` has not refreshed yet, so only the store can refuse.
        let err = select_club(&second, Some("Alice"), "b", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadySelected { .. }));
        assert_eq!(store.list_selections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn preconditions_are_checked_in_order() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        let before = store.request_count();

        let err = select_club(&state, Some("   "), "a", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(ref m) if m.contains("display name")));

        let err = select_club(&state, Some("Alice"), "a", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(ref m) if m.contains("confirmed")));

        let err = select_club(&state, Some("Alice"), "nope", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert_eq!(store.request_count(), before);
    }

    #[tokio::test]
    async fn store_failure_leaves_snapshot_untouched() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;

        store.set_offline(true);
        let err = select_club(&state, Some("Alice"), "a", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::WriteFailed(_)));
        assert_eq!(state.read_board(|b| b.selection_count()).await, 0);
    }

    #[tokio::test]
    async fn non_positive_limit_is_rejected_without_store_call() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        let before = store.request_count();

        for limit in [0, -3, 101] {
            let err = update_limit(&state, limit).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        let err = update_limit(&state, 11).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(ref m) if m.contains("already")));

        assert_eq!(store.request_count(), before);
    }

    #[tokio::test]
    async fn limit_update_is_written_and_refetched() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 1).await;
        select_club(&state, Some("Alice"), "a", true).await.unwrap();

        let updated = update_limit(&state, 2).await.unwrap();
        assert_eq!(updated.player_limit, 2);
        assert_eq!(store.get_config().await.unwrap().unwrap().player_limit, 2);
        assert_eq!(state.read_board(|b| b.player_limit()).await, 2);

        select_club(&state, Some("Bob"), "b", true).await.unwrap();
    }

    #[tokio::test]
    async fn failed_limit_write_keeps_previous_limit() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;

        store.set_offline(true);
        let before = store.request_count();
        let err = update_limit(&state, 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::WriteFailed(_)));
        assert_eq!(store.request_count(), before + 1);
        assert_eq!(state.read_board(|b| b.player_limit()).await, 11);

        store.set_offline(false);
        assert_eq!(store.get_config().await.unwrap().unwrap().player_limit, 11);
    }

    #[tokio::test]
    async fn limit_update_requires_loaded_config() {
        let state = AppState::new(test_config(11), SessionRegistry::in_memory());
        state
            .install_store(Arc::new(MemorySelectionStore::new()))
            .await;

        let err = update_limit(&state, 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn delete_frees_club_and_user() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        let selection = select_club(&state, Some("Alice"), "a", true).await.unwrap();

        delete_selection(&state, selection.id).await.unwrap();
        assert!(state.read_board(|b| b.selection_for_club("a").is_none()).await);

        select_club(&state, Some("Bob"), "a", true).await.unwrap();
        select_club(&state, Some("Alice"), "b", true).await.unwrap();

        let err = delete_selection(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_selection() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        let selection = select_club(&state, Some("Alice"), "a", true).await.unwrap();

        store.set_offline(true);
        let before = store.request_count();
        let err = delete_selection(&state, selection.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::WriteFailed(_)));
        assert_eq!(store.request_count(), before + 1);
        assert!(state.read_board(|b| b.selection_for_club("a").is_some()).await);

        store.set_offline(false);
        assert_eq!(store.list_selections().await.unwrap(), vec![selection]);
    }

    #[tokio::test]
    async fn refresh_converges_regardless_of_order() {
        let store = MemorySelectionStore::new();
        let writer = booted(&store, 11).await;
        let reader = booted(&store, 11).await;

        select_club(&writer, Some("Alice"), "a", true).await.unwrap();
        update_limit(&writer, 7).await.unwrap();
        let doomed = select_club(&writer, Some("Bob"), "b", true).await.unwrap();
        delete_selection(&writer, doomed.id).await.unwrap();

        refresh(&reader, StoreTable::Config).await;
        refresh(&reader, StoreTable::Selections).await;
        refresh(&reader, StoreTable::Config).await;

        let expected = store.list_selections().await.unwrap();
        assert_eq!(reader.read_board(|b| b.selections().to_vec()).await, expected);
        assert_eq!(reader.read_board(|b| b.player_limit()).await, 7);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        select_club(&state, Some("Alice"), "a", true).await.unwrap();

        store.set_offline(true);
        refresh(&state, StoreTable::Selections).await;
        assert_eq!(state.read_board(|b| b.selection_count()).await, 1);
    }
}
