use axum::{Router, http::HeaderMap};
use uuid::Uuid;

use crate::{dto::session::SESSION_HEADER, error::AppError, state::SharedState};

/// Moderation routes.
pub mod admin;
/// Club grid.
pub mod board;
/// Swagger UI.
pub mod docs;
/// Health check.
pub mod health;
/// Sessions and picks.
pub mod session;
/// Server-sent events.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(board::router())
        .merge(session::router())
        .merge(admin::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Session id carried by the `X-Session-Id` header, if any.
pub(crate) fn optional_session_id(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("malformed session header `X-Session-Id`".into()))
}

/// Session id carried by the `X-Session-Id` header.
pub(crate) fn session_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    optional_session_id(headers)?
        .ok_or_else(|| AppError::Unauthorized("missing session header `X-Session-Id`".into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        dao::selection_store::MemorySelectionStore,
        services::controller::tests::booted,
    };

    async fn send(app: &Router<()>, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(method: &str, uri: &str, session: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn open_session(app: &Router<()>, name: &str) -> String {
        let response = send(app, request("POST", "/sessions", None, Some(json!({ "name": name })))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn pick_flow_over_http() {
        let store = MemorySelectionStore::new();
        let app = router(booted(&store, 11).await);

        let alice = open_session(&app, "Alice").await;
        let response = send(
            &app,
            request("POST", "/selections", Some(&alice), Some(json!({ "club_id": "a", "confirm": true }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let bob = open_session(&app, "Bob").await;
        let response = send(
            &app,
            request("POST", "/selections", Some(&bob), Some(json!({ "club_id": "a", "confirm": true }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let message = json_body(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("already been selected"));

        let board = json_body(send(&app, request("GET", "/board", Some(&alice), None)).await).await;
        assert_eq!(board["participation"]["phase"], "locked");
        assert_eq!(board["participation"]["club_id"], "a");
        assert_eq!(board["limit"]["selection_count"], 1);
    }

    #[tokio::test]
    async fn blank_name_is_a_bad_request() {
        let store = MemorySelectionStore::new();
        let app = router(booted(&store, 11).await);

        let response = send(&app, request("POST", "/sessions", None, Some(json!({ "name": "  " })))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_require_admin_mode() {
        let store = MemorySelectionStore::new();
        let app = router(booted(&store, 11).await);
        let eve = open_session(&app, "Eve").await;

        let response = send(&app, request("GET", "/admin/selections", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = send(&app, request("GET", "/admin/selections", Some(&eve), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            request("POST", "/sessions/me/admin", Some(&eve), Some(json!({ "password": "nope" }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            request("POST", "/sessions/me/admin", Some(&eve), Some(json!({ "password": "letmein" }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            request("PUT", "/admin/config", Some(&eve), Some(json!({ "player_limit": 0 }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            request("PUT", "/admin/config", Some(&eve), Some(json!({ "player_limit": 5 }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["player_limit"], 5);

        let dashboard = json_body(send(&app, request("GET", "/admin/selections", Some(&eve), None)).await).await;
        assert_eq!(dashboard["total_selections"], 0);
        assert_eq!(dashboard["available_clubs"], 3);

        let missing = format!("/admin/selections/{}", Uuid::new_v4());
        let response = send(&app, request("DELETE", &missing, Some(&eve), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_session_header_is_rejected() {
        let store = MemorySelectionStore::new();
        let app = router(booted(&store, 11).await);

        let response = send(&app, request("GET", "/sessions/me", Some("not-a-uuid"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
