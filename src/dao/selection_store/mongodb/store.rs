use std::{sync::Arc, time::Duration, time::SystemTime};

use futures::{StreamExt, TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc},
    change_stream::event::OperationType,
    options::{IndexOptions, ReturnDocument},
};
use tokio::{
    sync::{RwLock, broadcast},
    time::sleep,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    CLUB_COLLECTION_NAME, CONFIG_COLLECTION_NAME, SELECTION_COLLECTION_NAME,
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, classify_selection_write, is_duplicate_key},
    models::{
        CONFIG_SINGLETON_FIELD, MongoClubDocument, MongoConfigDocument, MongoSelectionDocument,
        config_insert_if_absent, config_singleton_filter, doc_id,
    },
};
use crate::dao::{
    models::{ClubEntity, GameConfigEntity, SelectionEntity},
    selection_store::{ChangeEvent, ChangeKind, SelectionStore, StoreTable},
    storage::StorageResult,
};

const CHANGE_FEED_CAPACITY: usize = 64;
const WATCH_RETRY_INITIAL: Duration = Duration::from_secs(1);
const WATCH_RETRY_MAX: Duration = Duration::from_secs(30);

/// MongoDB-backed [`SelectionStore`].
///
/// Uniqueness lives in two unique indexes on `user_selections`. Change notifications come from
/// MongoDB change streams when the deployment supports them (replica sets), and from this
/// process's own writes in every case.
#[derive(Clone)]
pub struct MongoSelectionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
    changes: broadcast::Sender<ChangeEvent>,
}

struct MongoState {
    // Keeps the connection pool alive alongside the database handle.
    _client: Client,
    database: Database,
}

impl MongoInner {
    async fn database(&self) -> Database {
        let guard = self.state.read().await;
        guard.database.clone()
    }

    async fn ping(&self) -> MongoResult<()> {
        self.database()
            .await
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        *guard = MongoState {
            _client: client,
            database,
        };
        Ok(())
    }

    fn notify(&self, table: StoreTable, kind: ChangeKind) {
        let _ = self.changes.send(ChangeEvent::new(table, kind));
    }
}

impl MongoSelectionStore {
    /// Establish a connection to MongoDB, ensure indexes and start the change-stream watchers.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;
        let (changes, _receiver) = broadcast::channel(CHANGE_FEED_CAPACITY);

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState {
                _client: client,
                database,
            }),
            config,
            changes,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        store.spawn_change_stream(StoreTable::Selections);
        store.spawn_change_stream(StoreTable::Config);
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.selections().await;

        for (field, name) in [
            ("club_id", "selection_club_unique"),
            ("user_name", "selection_user_unique"),
        ] {
            let index = mongodb::IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(true))
                        .build(),
                )
                .build();

            collection
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: SELECTION_COLLECTION_NAME,
                    index: name,
                    source,
                })?;
        }

        let clubs = self.clubs().await;
        let name_index = mongodb::IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("club_name_idx".to_owned()))
                    .build(),
            )
            .build();
        clubs
            .create_index(name_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: CLUB_COLLECTION_NAME,
                index: "club_name_idx",
                source,
            })?;

        let configs = self.configs().await;
        let singleton_index = mongodb::IndexModel::builder()
            .keys(doc! { CONFIG_SINGLETON_FIELD: 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("config_singleton_unique".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        configs
            .create_index(singleton_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: CONFIG_COLLECTION_NAME,
                index: "config_singleton_unique",
                source,
            })?;

        Ok(())
    }

    /// Forward change-stream events for `table` into the local broadcast feed.
    ///
    /// Standalone servers reject `watch`; the task then keeps retrying with backoff while local
    /// write notifications keep this process consistent.
    fn spawn_change_stream(&self, table: StoreTable) {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut delay = WATCH_RETRY_INITIAL;

            loop {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let collection = inner.database().await.collection::<Document>(table.name());
                let changes = inner.changes.clone();
                drop(inner);

                match collection.watch().await {
                    Ok(mut stream) => {
                        info!(%table, "watching MongoDB change stream");
                        delay = WATCH_RETRY_INITIAL;
                        while let Some(next) = stream.next().await {
                            match next {
                                Ok(event) => {
                                    let kind = match event.operation_type {
                                        OperationType::Insert => ChangeKind::Insert,
                                        OperationType::Delete => ChangeKind::Delete,
                                        _ => ChangeKind::Update,
                                    };
                                    debug!(%table, ?kind, "MongoDB change stream event");
                                    let _ = changes.send(ChangeEvent::new(table, kind));
                                }
                                Err(err) => {
                                    warn!(%table, error = %err, "MongoDB change stream failed");
                                    break;
                                }
                            }
                        }
                    }
                    Err(err) => {
                        warn!(
                            %table,
                            error = %err,
                            "MongoDB change stream unavailable; only local writes will notify"
                        );
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(WATCH_RETRY_MAX);
            }
        });
    }

    async fn clubs(&self) -> Collection<MongoClubDocument> {
        self.inner
            .database()
            .await
            .collection::<MongoClubDocument>(CLUB_COLLECTION_NAME)
    }

    async fn selections(&self) -> Collection<MongoSelectionDocument> {
        self.inner
            .database()
            .await
            .collection::<MongoSelectionDocument>(SELECTION_COLLECTION_NAME)
    }

    async fn configs(&self) -> Collection<MongoConfigDocument> {
        self.inner
            .database()
            .await
            .collection::<MongoConfigDocument>(CONFIG_COLLECTION_NAME)
    }

    async fn list_clubs(&self) -> MongoResult<Vec<ClubEntity>> {
        let read_err = |source| MongoDaoError::Read {
            collection: CLUB_COLLECTION_NAME,
            source,
        };
        let docs: Vec<MongoClubDocument> = self
            .clubs()
            .await
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await
            .map_err(read_err)?
            .try_collect()
            .await
            .map_err(read_err)?;

        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn seed_clubs(&self, clubs: Vec<ClubEntity>) -> MongoResult<()> {
        let collection = self.clubs().await;
        for club in clubs {
            let filter = doc_id(&club.id);
            let document: MongoClubDocument = club.into();
            collection
                .replace_one(filter, &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: CLUB_COLLECTION_NAME,
                    source,
                })?;
        }
        Ok(())
    }

    async fn list_selections(&self) -> MongoResult<Vec<SelectionEntity>> {
        let read_err = |source| MongoDaoError::Read {
            collection: SELECTION_COLLECTION_NAME,
            source,
        };
        let docs: Vec<MongoSelectionDocument> = self
            .selections()
            .await
            .find(doc! {})
            .await
            .map_err(read_err)?
            .try_collect()
            .await
            .map_err(read_err)?;

        docs.into_iter().map(SelectionEntity::try_from).collect()
    }

    async fn get_config(&self) -> MongoResult<Option<GameConfigEntity>> {
        let document = self
            .configs()
            .await
            .find_one(config_singleton_filter())
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: CONFIG_COLLECTION_NAME,
                source,
            })?;

        document.map(GameConfigEntity::try_from).transpose()
    }

    /// Insert the config row unless one exists, returning whichever row is stored.
    async fn create_config(&self, player_limit: u32) -> MongoResult<GameConfigEntity> {
        let candidate = GameConfigEntity::new(player_limit);
        let upserted = self
            .configs()
            .await
            .find_one_and_update(config_singleton_filter(), config_insert_if_absent(&candidate))
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        let stored = match upserted {
            Ok(Some(document)) => GameConfigEntity::try_from(document)?,
            // Concurrent upserts can both miss the filter; the unique index lets one through.
            Err(source) if is_duplicate_key(&source) => {
                debug!("config row created concurrently; reading it back");
                self.get_config()
                    .await?
                    .ok_or(MongoDaoError::ConfigNotFound { id: candidate.id })?
            }
            Ok(None) => return Err(MongoDaoError::ConfigNotFound { id: candidate.id }),
            Err(source) => {
                return Err(MongoDaoError::Write {
                    collection: CONFIG_COLLECTION_NAME,
                    source,
                });
            }
        };

        if stored.id == candidate.id {
            self.inner.notify(StoreTable::Config, ChangeKind::Insert);
        }
        Ok(stored)
    }

    async fn insert_selection(
        &self,
        user_name: String,
        club_id: String,
    ) -> MongoResult<SelectionEntity> {
        let selection = SelectionEntity::new(user_name, club_id);
        let document: MongoSelectionDocument = selection.clone().into();
        self.selections()
            .await
            .insert_one(&document)
            .await
            .map_err(classify_selection_write)?;

        self.inner
            .notify(StoreTable::Selections, ChangeKind::Insert);
        Ok(selection)
    }

    async fn delete_selection(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .selections()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SELECTION_COLLECTION_NAME,
                source,
            })?;

        let deleted = result.deleted_count > 0;
        if deleted {
            self.inner
                .notify(StoreTable::Selections, ChangeKind::Delete);
        }
        Ok(deleted)
    }

    async fn update_config(
        &self,
        id: Uuid,
        player_limit: u32,
        updated_at: SystemTime,
    ) -> MongoResult<()> {
        let update = doc! {
            "$set": {
                "player_limit": i64::from(player_limit),
                "updated_at": DateTime::from_system_time(updated_at),
            }
        };
        let result = self
            .configs()
            .await
            .update_one(doc_id(id), update)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: CONFIG_COLLECTION_NAME,
                source,
            })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::ConfigNotFound { id });
        }

        self.inner.notify(StoreTable::Config, ChangeKind::Update);
        Ok(())
    }
}

impl SelectionStore for MongoSelectionStore {
    fn list_clubs(&self) -> BoxFuture<'static, StorageResult<Vec<ClubEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_clubs().await.map_err(Into::into) })
    }

    fn seed_clubs(&self, clubs: Vec<ClubEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.seed_clubs(clubs).await.map_err(Into::into) })
    }

    fn list_selections(&self) -> BoxFuture<'static, StorageResult<Vec<SelectionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_selections().await.map_err(Into::into) })
    }

    fn get_config(&self) -> BoxFuture<'static, StorageResult<Option<GameConfigEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.get_config().await.map_err(Into::into) })
    }

    fn create_config(
        &self,
        player_limit: u32,
    ) -> BoxFuture<'static, StorageResult<GameConfigEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_config(player_limit).await.map_err(Into::into) })
    }

    fn insert_selection(
        &self,
        user_name: String,
        club_id: String,
    ) -> BoxFuture<'static, StorageResult<SelectionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_selection(user_name, club_id)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_selection(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_selection(id).await.map_err(Into::into) })
    }

    fn update_config(
        &self,
        id: Uuid,
        player_limit: u32,
        updated_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_config(id, player_limit, updated_at)
                .await
                .map_err(Into::into)
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.changes.subscribe()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
