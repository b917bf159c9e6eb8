use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{AdminDashboardResponse, UpdateLimitRequest},
        board::LimitStatus,
    },
    error::AppError,
    routes::session_id,
    services::{admin_gate, board_service, controller},
    state::SharedState,
};

/// Moderation endpoints, reachable only from sessions in admin mode.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/selections", get(list_selections))
        .route("/admin/selections/{id}", delete(delete_selection))
        .route("/admin/config", put(update_limit))
        .route_layer(middleware::from_fn_with_state(state, require_admin_session))
}

#[utoipa::path(
    get,
    path = "/admin/selections",
    tag = "admin",
    params(("X-Session-Id" = String, Header, description = "Session id with admin mode enabled")),
    responses((status = 200, description = "Selections newest first with totals", body = AdminDashboardResponse))
)]
/// Return the admin table of selections.
pub async fn list_selections(State(state): State<SharedState>) -> Json<AdminDashboardResponse> {
    Json(board_service::admin_dashboard(&state).await)
}

#[utoipa::path(
    delete,
    path = "/admin/selections/{id}",
    tag = "admin",
    params(("X-Session-Id" = String, Header, description = "Session id with admin mode enabled"),
    ("id" = String, Path, description = "Identifier of the selection to remove")),
    responses(
        (status = 204, description = "Selection removed; the club and the user are free again"),
        (status = 404, description = "Unknown selection")
    )
)]
/// Remove a selection. There is no undo.
pub async fn delete_selection(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    controller::delete_selection(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/admin/config",
    tag = "admin",
    params(("X-Session-Id" = String, Header, description = "Session id with admin mode enabled")),
    request_body = UpdateLimitRequest,
    responses(
        (status = 200, description = "Player limit updated", body = LimitStatus),
        (status = 400, description = "Limit out of bounds or unchanged")
    )
)]
/// Change the player limit.
pub async fn update_limit(
    State(state): State<SharedState>,
    Json(payload): Json<UpdateLimitRequest>,
) -> Result<Json<LimitStatus>, AppError> {
    controller::update_limit(&state, payload.player_limit).await?;
    Ok(Json(board_service::limit_status(&state).await))
}

async fn require_admin_session(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let id = session_id(req.headers())?;
    admin_gate::require_admin(&state, id)?;
    Ok(next.run(req).await)
}
