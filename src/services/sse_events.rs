use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        board::LimitStatus,
        session::SelectionSummary,
        sse::{ConfigChangedEvent, SelectionsChangedEvent, ServerEvent, SystemStatus},
    },
    state::SharedState,
};

const EVENT_SELECTIONS: &str = "board.selections";
const EVENT_CONFIG: &str = "board.config";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the freshly fetched selections together with the limit figures.
pub async fn broadcast_selections(state: &SharedState) {
    let bounds = state.config().limit_bounds();
    let payload = state
        .read_board(|board| SelectionsChangedEvent {
            selections: board
                .selections()
                .iter()
                .map(SelectionSummary::from)
                .collect(),
            limit: LimitStatus::project(board, &bounds),
        })
        .await;
    send_public_event(state, EVENT_SELECTIONS, &payload);
}

/// Broadcast the freshly fetched config row.
pub async fn broadcast_config(state: &SharedState) {
    let bounds = state.config().limit_bounds();
    let payload = state
        .read_board(|board| ConfigChangedEvent {
            limit: LimitStatus::project(board, &bounds),
        })
        .await;
    send_public_event(state, EVENT_CONFIG, &payload);
}

/// Broadcast that the backend entered or left degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
