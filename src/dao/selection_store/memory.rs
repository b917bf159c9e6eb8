//! Process-local [`SelectionStore`] with the same constraints as the database backends.

use std::{
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::SystemTime,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::{ChangeEvent, ChangeKind, SelectionStore, StoreTable};
use crate::dao::{
    models::{ClubEntity, GameConfigEntity, SelectionEntity},
    storage::{StorageError, StorageResult, UniqueField},
};

const CHANGE_FEED_CAPACITY: usize = 64;

/// Failures specific to the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The store was switched offline.
    #[error("in-memory store is offline")]
    Offline,
    /// The table lock was poisoned by a panicking writer.
    #[error("in-memory store lock poisoned")]
    Poisoned,
}

impl From<MemoryStoreError> for StorageError {
    fn from(err: MemoryStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

#[derive(Default)]
struct Tables {
    clubs: IndexMap<String, ClubEntity>,
    selections: IndexMap<Uuid, SelectionEntity>,
    config: Option<GameConfigEntity>,
}

struct MemoryInner {
    tables: Mutex<Tables>,
    changes: broadcast::Sender<ChangeEvent>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

/// In-memory [`SelectionStore`] shared by every clone.
#[derive(Clone)]
pub struct MemorySelectionStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemorySelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySelectionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                tables: Mutex::new(Tables::default()),
                changes,
                offline: AtomicBool::new(false),
                requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a store pre-populated with `clubs`.
    #[cfg(test)]
    pub(crate) fn with_clubs(clubs: Vec<ClubEntity>) -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.inner.tables.lock() {
            for club in clubs {
                tables.clubs.insert(club.id.clone(), club);
            }
        }
        store
    }

    /// Simulate an outage: while offline every request fails with an unavailable error.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests served (or refused) since creation.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, MemoryStoreError> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::Offline);
        }
        self.inner
            .tables
            .lock()
            .map_err(|_| MemoryStoreError::Poisoned)
    }

    fn notify(&self, table: StoreTable, kind: ChangeKind) {
        debug!(%table, ?kind, "in-memory store change");
        let _ = self.inner.changes.send(ChangeEvent::new(table, kind));
    }

    fn list_clubs_sync(&self) -> StorageResult<Vec<ClubEntity>> {
        let tables = self.tables()?;
        let mut clubs: Vec<ClubEntity> = tables.clubs.values().cloned().collect();
        clubs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clubs)
    }

    fn seed_clubs_sync(&self, clubs: Vec<ClubEntity>) -> StorageResult<()> {
        let mut tables = self.tables()?;
        for club in clubs {
            tables.clubs.insert(club.id.clone(), club);
        }
        Ok(())
    }

    fn list_selections_sync(&self) -> StorageResult<Vec<SelectionEntity>> {
        let tables = self.tables()?;
        Ok(tables.selections.values().cloned().collect())
    }

    fn get_config_sync(&self) -> StorageResult<Option<GameConfigEntity>> {
        let tables = self.tables()?;
        Ok(tables.config.clone())
    }

    fn create_config_sync(&self, player_limit: u32) -> StorageResult<GameConfigEntity> {
        let config = {
            let mut tables = self.tables()?;
            if let Some(existing) = tables.config.as_ref() {
                return Ok(existing.clone());
            }
            let config = GameConfigEntity::new(player_limit);
            tables.config = Some(config.clone());
            config
        };
        self.notify(StoreTable::Config, ChangeKind::Insert);
        Ok(config)
    }

    fn insert_selection_sync(
        &self,
        user_name: String,
        club_id: String,
    ) -> StorageResult<SelectionEntity> {
        let selection = {
            let mut tables = self.tables()?;
            if tables.selections.values().any(|s| s.club_id == club_id) {
                return Err(StorageError::UniqueViolation {
                    field: UniqueField::ClubId,
                });
            }
            if tables.selections.values().any(|s| s.user_name == user_name) {
                return Err(StorageError::UniqueViolation {
                    field: UniqueField::UserName,
                });
            }
            let selection = SelectionEntity::new(user_name, club_id);
            tables.selections.insert(selection.id, selection.clone());
            selection
        };
        self.notify(StoreTable::Selections, ChangeKind::Insert);
        Ok(selection)
    }

    fn delete_selection_sync(&self, id: Uuid) -> StorageResult<bool> {
        let deleted = {
            let mut tables = self.tables()?;
            tables.selections.shift_remove(&id).is_some()
        };
        if deleted {
            self.notify(StoreTable::Selections, ChangeKind::Delete);
        }
        Ok(deleted)
    }

    fn update_config_sync(
        &self,
        id: Uuid,
        player_limit: u32,
        updated_at: SystemTime,
    ) -> StorageResult<()> {
        {
            let mut tables = self.tables()?;
            match tables.config.as_mut() {
                Some(config) if config.id == id => {
                    config.player_limit = player_limit;
                    config.updated_at = updated_at;
                }
                _ => return Err(StorageError::Rejected(format!("config `{id}` not found"))),
            }
        }
        self.notify(StoreTable::Config, ChangeKind::Update);
        Ok(())
    }
}

impl SelectionStore for MemorySelectionStore {
    fn list_clubs(&self) -> BoxFuture<'static, StorageResult<Vec<ClubEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_clubs_sync() })
    }

    fn seed_clubs(&self, clubs: Vec<ClubEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.seed_clubs_sync(clubs) })
    }

    fn list_selections(&self) -> BoxFuture<'static, StorageResult<Vec<SelectionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_selections_sync() })
    }

    fn get_config(&self) -> BoxFuture<'static, StorageResult<Option<GameConfigEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.get_config_sync() })
    }

    fn create_config(
        &self,
        player_limit: u32,
    ) -> BoxFuture<'static, StorageResult<GameConfigEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_config_sync(player_limit) })
    }

    fn insert_selection(
        &self,
        user_name: String,
        club_id: String,
    ) -> BoxFuture<'static, StorageResult<SelectionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_selection_sync(user_name, club_id) })
    }

    fn delete_selection(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_selection_sync(id) })
    }

    fn update_config(
        &self,
        id: Uuid,
        player_limit: u32,
        updated_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_config_sync(id, player_limit, updated_at) })
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.changes.subscribe()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.tables().map(|_| ()).map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.health_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn club(id: &str, name: &str) -> ClubEntity {
        ClubEntity {
            id: id.into(),
            name: name.into(),
            league: "Premier League".into(),
            logo_url: format!("https://crests.example/{id}.png"),
        }
    }

    #[tokio::test]
    async fn clubs_are_listed_by_name() {
        let store = MemorySelectionStore::with_clubs(vec![
            club("wolves", "Wolverhampton"),
            club("ars", "Arsenal"),
            club("che", "Chelsea"),
        ]);

        let names: Vec<String> = store
            .list_clubs()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Arsenal", "Chelsea", "Wolverhampton"]);
    }

    #[tokio::test]
    async fn duplicate_club_is_rejected() {
        let store = MemorySelectionStore::new();
        store
            .insert_selection("alice".into(), "ars".into())
            .await
            .unwrap();

        let err = store
            .insert_selection("bob".into(), "ars".into())
            .await
            .unwrap_err();
        assert_eq!(err.unique_field(), Some(UniqueField::ClubId));
    }

    #[tokio::test]
    async fn duplicate_user_is_rejected() {
        let store = MemorySelectionStore::new();
        store
            .insert_selection("alice".into(), "ars".into())
            .await
            .unwrap();

        let err = store
            .insert_selection("alice".into(), "che".into())
            .await
            .unwrap_err();
        assert_eq!(err.unique_field(), Some(UniqueField::UserName));
    }

    #[tokio::test]
    async fn writes_emit_change_events() {
        let store = MemorySelectionStore::new();
        let mut feed = store.subscribe();

        let config = store.create_config(11).await.unwrap();
        let selection = store
            .insert_selection("alice".into(), "ars".into())
            .await
            .unwrap();
        store
            .update_config(config.id, 5, SystemTime::now())
            .await
            .unwrap();
        assert!(store.delete_selection(selection.id).await.unwrap());

        let mut events = Vec::new();
        while let Ok(event) = feed.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ChangeEvent::new(StoreTable::Config, ChangeKind::Insert),
                ChangeEvent::new(StoreTable::Selections, ChangeKind::Insert),
                ChangeEvent::new(StoreTable::Config, ChangeKind::Update),
                ChangeEvent::new(StoreTable::Selections, ChangeKind::Delete),
            ]
        );
    }

    #[tokio::test]
    async fn config_row_is_created_once() {
        let store = MemorySelectionStore::new();
        let mut feed = store.subscribe();

        let first = store.create_config(11).await.unwrap();
        let second = store.create_config(4).await.unwrap();

        assert_eq!(second, first);
        assert_eq!(store.get_config().await.unwrap(), Some(first));
        assert_eq!(
            feed.try_recv().unwrap(),
            ChangeEvent::new(StoreTable::Config, ChangeKind::Insert)
        );
        assert!(feed.try_recv().is_err());
    }

    #[tokio::test]
    async fn deleting_unknown_selection_is_silent() {
        let store = MemorySelectionStore::new();
        let mut feed = store.subscribe();
        assert!(!store.delete_selection(Uuid::new_v4()).await.unwrap());
        assert!(feed.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_store_fails_every_request() {
        let store = MemorySelectionStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.list_selections().await,
            Err(StorageError::Unavailable { .. })
        ));
        assert!(store.health_check().await.is_err());

        store.set_offline(false);
        assert!(store.health_check().await.is_ok());
        assert_eq!(store.request_count(), 3);
    }
}
