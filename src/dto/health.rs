use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of selections in the local board snapshot.
    pub selections: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(selections: usize) -> Self {
        Self {
            status: "ok".to_string(),
            selections,
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(selections: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            selections,
        }
    }
}
