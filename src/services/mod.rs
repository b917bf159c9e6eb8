/// Admin gate in front of the moderation routes.
pub mod admin_gate;
/// Club grid and admin table projections.
pub mod board_service;
/// Store notification listener.
pub mod change_feed;
/// Board snapshot synchronisation and guarded writes.
pub mod controller;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Name entry, logout and picking for device sessions.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Store connection supervisor with capped backoff.
pub mod storage_supervisor;
