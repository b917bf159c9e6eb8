use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{board::LimitStatus, session::SelectionSummary};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a store connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after the selections have been re-fetched.
pub struct SelectionsChangedEvent {
    pub selections: Vec<SelectionSummary>,
    pub limit: LimitStatus,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after the config row has been re-fetched.
pub struct ConfigChangedEvent {
    pub limit: LimitStatus,
}
