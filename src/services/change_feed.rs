//! Reacts to store notifications by re-fetching the table that changed.

use std::sync::Arc;

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    dao::selection_store::{ChangeEvent, SelectionStore, StoreTable},
    services::controller,
    state::SharedState,
};

/// Subscribe to `store` and start the listener task.
pub fn spawn(state: SharedState, store: Arc<dyn SelectionStore>) -> JoinHandle<()> {
    let receiver = store.subscribe();
    tokio::spawn(run(state, receiver))
}

/// Re-fetch on every notification until the feed closes.
///
/// Notifications queued behind the one being handled are coalesced per table, since a single
/// re-fetch already reflects all of them.
pub async fn run(state: SharedState, mut receiver: broadcast::Receiver<ChangeEvent>) {
    loop {
        let first = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "change feed lagged; refreshing every table");
                controller::refresh(&state, StoreTable::Selections).await;
                controller::refresh(&state, StoreTable::Config).await;
                continue;
            }
            Err(RecvError::Closed) => {
                info!("change feed closed");
                break;
            }
        };

        debug!(table = %first.table, kind = ?first.kind, "change notification");
        let mut pending = vec![first.table];
        while let Ok(next) = receiver.try_recv() {
            if !pending.contains(&next.table) {
                pending.push(next.table);
            }
        }

        for table in pending {
            controller::refresh(&state, table).await;
        }
    }
}
