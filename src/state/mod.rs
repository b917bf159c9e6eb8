/// Board snapshot.
pub mod board;
/// Derived participation phase.
pub mod participation;
/// Device identities.
pub mod session;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::selection_store::SelectionStore,
    error::ServiceError,
    state::{board::ClubBoard, session::SessionIdentity},
};

pub use self::participation::Participation;
pub use self::session::SessionRegistry;
pub use self::sse::SseHub;

/// Handle to [`AppState`] shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Central application state: the store handle, the local board snapshot and device sessions.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn SelectionStore>>>,
    board: RwLock<ClubBoard>,
    sessions: SessionRegistry,
    public_sse: SseHub,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a store is installed.
    pub fn new(config: AppConfig, sessions: SessionRegistry) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let board = ClubBoard::new(config.default_player_limit());
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            board: RwLock::new(board),
            sessions,
            public_sse: SseHub::new(32),
            degraded: degraded_tx,
        })
    }

    /// Static configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn SelectionStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current store or fail with [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn SelectionStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn SelectionStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag: no store installed, or the installed one is failing health checks.
    pub async fn is_degraded(&self) -> bool {
        if *self.degraded.borrow() {
            return true;
        }
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Run `f` against the current board snapshot.
    pub async fn read_board<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&ClubBoard) -> T,
    {
        let guard = self.board.read().await;
        f(&guard)
    }

    /// Run `f` with exclusive access to the board snapshot.
    pub async fn with_board_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut ClubBoard) -> T,
    {
        let mut guard = self.board.write().await;
        f(&mut guard)
    }

    /// Device identities keyed by session id.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Look up a session or fail with [`ServiceError::Unauthorized`].
    pub fn require_session(&self, id: Uuid) -> Result<SessionIdentity, ServiceError> {
        self.sessions
            .get(id)
            .ok_or_else(|| ServiceError::Unauthorized(format!("unknown session `{id}`")))
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }
}
