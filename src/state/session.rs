//! Per-device identity: a display name and an admin flag, keyed by the session id the browser keeps.
//!
//! Identities are not verified by anything; they only remember what a device typed last time.
//! The table is bounded: idle anonymous sessions expire, and the least recently seen
//! non-admin sessions are evicted once the cap is reached. Writes to the session file are
//! batched by a background flusher.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    fs,
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on tracked sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
/// How long a session with neither a name nor the admin flag is kept.
pub const DEFAULT_IDLE_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
const FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Failures while writing the session file.
#[derive(Debug, Error)]
pub enum SessionFileError {
    /// The table could not be encoded.
    #[error("failed to serialize sessions")]
    Serialize(#[source] serde_json::Error),
    /// The file system refused the write.
    #[error("failed to write session file `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Locally persisted identity of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Display name, absent after logout.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Set by the admin gate.
    #[serde(default)]
    pub is_admin: bool,
}

impl SessionIdentity {
    /// Identity carrying a display name and no admin flag.
    pub fn named(user_name: impl Into<String>) -> Self {
        Self {
            user_name: Some(user_name.into()),
            is_admin: false,
        }
    }

    fn is_anonymous(&self) -> bool {
        self.user_name.is_none() && !self.is_admin
    }
}

struct SessionEntry {
    identity: SessionIdentity,
    last_seen: Instant,
}

impl SessionEntry {
    fn new(identity: SessionIdentity) -> Self {
        Self {
            identity,
            last_seen: Instant::now(),
        }
    }
}

struct RegistryInner {
    sessions: DashMap<Uuid, SessionEntry>,
    path: Option<PathBuf>,
    dirty: AtomicBool,
    write_gate: Mutex<()>,
}

/// Concurrent, bounded table of session identities with optional JSON persistence.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionRegistry {
    fn from_parts(sessions: DashMap<Uuid, SessionEntry>, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions,
                path,
                dirty: AtomicBool::new(false),
                write_gate: Mutex::new(()),
            }),
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: DEFAULT_IDLE_SESSION_TTL,
        }
    }

    /// Registry that never touches the disk.
    pub fn in_memory() -> Self {
        Self::from_parts(DashMap::new(), None)
    }

    /// Load identities from `path`, starting empty when the file is missing or unreadable.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let sessions = DashMap::new();

        match fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<BTreeMap<Uuid, SessionIdentity>>(&contents)
            {
                Ok(stored) => {
                    info!(path = %path.display(), count = stored.len(), "loaded sessions");
                    for (id, identity) in stored {
                        sessions.insert(id, SessionEntry::new(identity));
                    }
                }
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse session file; starting with no sessions"
                ),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "failed to read session file; starting with no sessions"
            ),
        }

        Self::from_parts(sessions, Some(path))
    }

    /// Override the session cap and the expiry of idle anonymous sessions.
    pub fn with_limits(mut self, max_sessions: usize, idle_ttl: Duration) -> Self {
        self.max_sessions = max_sessions.max(1);
        self.idle_ttl = idle_ttl;
        self
    }

    /// Register a new device and return its session id, making room first when the table is full.
    pub async fn create(&self, identity: SessionIdentity) -> Uuid {
        self.prune_idle();
        self.evict_to_fit();

        let id = Uuid::new_v4();
        self.inner.sessions.insert(id, SessionEntry::new(identity));
        self.mark_dirty();
        id
    }

    /// Look up an identity, refreshing its last-seen time.
    pub fn get(&self, id: Uuid) -> Option<SessionIdentity> {
        let mut entry = self.inner.sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.identity.clone())
    }

    /// Apply `update` to an existing identity and schedule a write of the table.
    pub async fn update<F>(&self, id: Uuid, update: F) -> Option<SessionIdentity>
    where
        F: FnOnce(&mut SessionIdentity),
    {
        let updated = {
            let mut entry = self.inner.sessions.get_mut(&id)?;
            update(&mut entry.identity);
            entry.last_seen = Instant::now();
            entry.identity.clone()
        };
        self.mark_dirty();
        Some(updated)
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Whether no session is tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    fn mark_dirty(&self) {
        self.inner.mark_dirty();
    }

    /// Drop sessions that carry neither a name nor the admin flag and have been idle too long.
    fn prune_idle(&self) {
        let ttl = self.idle_ttl;
        let before = self.inner.sessions.len();
        self.inner
            .sessions
            .retain(|_, entry| !(entry.identity.is_anonymous() && entry.last_seen.elapsed() >= ttl));
        let pruned = before.saturating_sub(self.inner.sessions.len());
        if pruned > 0 {
            debug!(pruned, "expired idle anonymous sessions");
            self.mark_dirty();
        }
    }

    /// Evict the least recently seen sessions, non-admins first, until one more fits.
    fn evict_to_fit(&self) {
        let max = self.max_sessions;
        let excess = (self.inner.sessions.len() + 1).saturating_sub(max);
        if excess == 0 {
            return;
        }

        let mut candidates: Vec<(bool, Instant, Uuid)> = self
            .inner
            .sessions
            .iter()
            .map(|entry| (entry.identity.is_admin, entry.last_seen, *entry.key()))
            .collect();
        candidates.sort_unstable();

        for (_, _, id) in candidates.into_iter().take(excess) {
            self.inner.sessions.remove(&id);
        }
        debug!(evicted = excess, max, "session table full; evicted least recently seen sessions");
        self.mark_dirty();
    }

    /// Write the table if it changed since the last write.
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    /// Flush pending changes periodically until the registry is dropped.
    pub fn spawn_flusher(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = interval(FLUSH_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.flush().await;
            }
        })
    }
}

impl RegistryInner {
    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    async fn flush(&self) {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.persist().await {
            self.mark_dirty();
            warn!(error = %err, "failed to persist sessions");
        }
    }

    /// Write the whole table to the session file, if one is configured.
    async fn persist(&self) -> Result<(), SessionFileError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        let _gate = self.write_gate.lock().await;
        let snapshot: BTreeMap<Uuid, SessionIdentity> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.identity.clone()))
            .collect();
        let contents =
            serde_json::to_string_pretty(&snapshot).map_err(SessionFileError::Serialize)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| SessionFileError::Write {
                    path: path.clone(),
                    source,
                })?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .await
            .map_err(|source| SessionFileError::Write {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, path)
            .await
            .map_err(|source| SessionFileError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), count = snapshot.len(), "sessions persisted");
        Ok(())
    }
}
