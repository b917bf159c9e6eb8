use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{selection_store::SelectionStore, storage::StorageError},
    services::{change_feed, controller},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the store, keep it healthy, and hold the shared state in degraded mode while it is unavailable.
///
/// Each successful connection installs the store, starts the change-feed listener and reloads the
/// board. When health checks keep failing the store is dropped and a fresh connection is attempted.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn SelectionStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_store(store.clone()).await;
                let feed = change_feed::spawn(state.clone(), store.clone());
                if let Err(err) = controller::bootstrap(&state).await {
                    warn!(error = %err, "initial board load failed; relying on later refreshes");
                }
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;

                feed.abort();
                state.clear_store().await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll the store until reconnection attempts are exhausted.
async fn watch_health(state: &SharedState, store: &dyn SelectionStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(_) => {
                if reconnect(state, store).await {
                    state.update_degraded(false);
                    // Notifications may have been missed while disconnected.
                    if let Err(err) = controller::load_all(state).await {
                        warn!(error = %err, "board reload after reconnection failed");
                    }
                    sleep(HEALTH_POLL_INTERVAL).await;
                } else {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    return;
                }
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn SelectionStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        dao::selection_store::MemorySelectionStore,
        services::controller::tests::test_config,
        state::{AppState, SessionRegistry},
    };

    #[tokio::test]
    async fn supervisor_installs_store_and_loads_board() {
        let state = AppState::new(test_config(11), SessionRegistry::in_memory());
        assert!(state.is_degraded().await);

        let store = MemorySelectionStore::new();
        let handle = tokio::spawn(run(state.clone(), move || {
            let store = store.clone();
            async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn SelectionStore>) }
        }));

        timeout(Duration::from_secs(2), async {
            while !state.read_board(|b| b.catalog_loaded() && b.config_id().is_some()).await {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(!state.is_degraded().await);
        assert_eq!(state.read_board(|b| b.clubs().len()).await, 3);
        handle.abort();
    }
}
