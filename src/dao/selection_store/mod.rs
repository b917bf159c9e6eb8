/// Process-local backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::{fmt, time::SystemTime};

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::models::{ClubEntity, GameConfigEntity, SelectionEntity};
use crate::dao::storage::StorageResult;

pub use self::memory::MemorySelectionStore;

/// Table that emitted a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    /// `user_selections`
    Selections,
    /// `game_config`
    Config,
}

impl StoreTable {
    /// Name of the backing table/collection.
    pub fn name(self) -> &'static str {
        match self {
            StoreTable::Selections => "user_selections",
            StoreTable::Config => "game_config",
        }
    }
}

impl fmt::Display for StoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of row mutation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A row was added.
    Insert,
    /// A row was modified (or replaced).
    Update,
    /// A row was removed.
    Delete,
}

/// Push notification emitted on any insert/update/delete of a watched table.
///
/// Delivery is at-least-once and unordered relative to other tables, so
/// consumers should treat it purely as a "something changed, re-fetch" hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Table the change happened in.
    pub table: StoreTable,
    /// What happened to the row.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Notification for `kind` on `table`.
    pub fn new(table: StoreTable, kind: ChangeKind) -> Self {
        Self { table, kind }
    }
}

/// Abstraction over the external store holding the catalog, the selections and the config row.
///
/// Implementations own the uniqueness constraints: `insert_selection` must fail with
/// [`StorageError::UniqueViolation`](crate::dao::storage::StorageError::UniqueViolation) when the
/// club or the user name is already claimed.
pub trait SelectionStore: Send + Sync {
    /// Catalog ordered by club name.
    fn list_clubs(&self) -> BoxFuture<'static, StorageResult<Vec<ClubEntity>>>;
    /// Upsert catalog entries, keyed by club id.
    fn seed_clubs(&self, clubs: Vec<ClubEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Every committed selection.
    fn list_selections(&self) -> BoxFuture<'static, StorageResult<Vec<SelectionEntity>>>;
    /// The config row, if it has been created.
    fn get_config(&self) -> BoxFuture<'static, StorageResult<Option<GameConfigEntity>>>;
    /// Create the singleton config row with `player_limit`, or return the row already stored.
    fn create_config(&self, player_limit: u32)
    -> BoxFuture<'static, StorageResult<GameConfigEntity>>;
    /// Commit a selection; fails on either uniqueness constraint.
    fn insert_selection(
        &self,
        user_name: String,
        club_id: String,
    ) -> BoxFuture<'static, StorageResult<SelectionEntity>>;
    /// Remove a selection, returning whether a row was deleted.
    fn delete_selection(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Write a new limit to the config row identified by `id`.
    fn update_config(
        &self,
        id: Uuid,
        player_limit: u32,
        updated_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Register for change notifications on the selections and config tables.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
    /// Cheap liveness probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
