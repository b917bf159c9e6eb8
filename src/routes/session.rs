use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        admin::AdminLoginRequest,
        session::{DisplayNameRequest, SelectClubRequest, SelectionSummary, SessionResponse},
    },
    error::AppError,
    routes::session_id,
    services::{admin_gate, session_service},
    state::SharedState,
};

/// Session lifecycle, club picking and the admin gate.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(open_session))
        .route("/sessions/me", get(current_session))
        .route("/sessions/me/name", put(rename).delete(logout))
        .route(
            "/sessions/me/admin",
            post(admin_login).delete(admin_logout),
        )
        .route("/selections", post(select_club))
}

#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = DisplayNameRequest,
    responses(
        (status = 201, description = "Session opened", body = SessionResponse),
        (status = 400, description = "Blank or invalid display name")
    )
)]
/// Open a session for the entered display name and return its id.
pub async fn open_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DisplayNameRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = session_service::open_session(&state, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/sessions/me",
    tag = "sessions",
    params(("X-Session-Id" = String, Header, description = "Session id returned by POST /sessions")),
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
/// Return the identity and participation phase of the calling session.
pub async fn current_session(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let id = session_id(&headers)?;
    Ok(Json(session_service::describe(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/sessions/me/name",
    tag = "sessions",
    params(("X-Session-Id" = String, Header, description = "Session id returned by POST /sessions")),
    request_body = DisplayNameRequest,
    responses((status = 200, description = "Display name changed", body = SessionResponse))
)]
/// Change the display name of the calling session.
pub async fn rename(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<DisplayNameRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let id = session_id(&headers)?;
    Ok(Json(
        session_service::rename(&state, id, &payload.name).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/sessions/me/name",
    tag = "sessions",
    params(("X-Session-Id" = String, Header, description = "Session id returned by POST /sessions")),
    responses((status = 200, description = "Display name cleared", body = SessionResponse))
)]
/// Forget the display name of the calling session.
pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let id = session_id(&headers)?;
    Ok(Json(session_service::logout(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/selections",
    tag = "sessions",
    params(("X-Session-Id" = String, Header, description = "Session id returned by POST /sessions")),
    request_body = SelectClubRequest,
    responses(
        (status = 201, description = "Club claimed", body = SelectionSummary),
        (status = 400, description = "Missing name or confirmation"),
        (status = 409, description = "Club taken, user already holds a club, or limit reached"),
        (status = 502, description = "Store rejected the write")
    )
)]
/// Claim a club for the calling session. The pick cannot be changed afterwards.
pub async fn select_club(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<SelectClubRequest>,
) -> Result<(StatusCode, Json<SelectionSummary>), AppError> {
    let id = session_id(&headers)?;
    let selection = session_service::select_club(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(selection)))
}

#[utoipa::path(
    post,
    path = "/sessions/me/admin",
    tag = "admin",
    params(("X-Session-Id" = String, Header, description = "Session id returned by POST /sessions")),
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin mode enabled", body = SessionResponse),
        (status = 401, description = "Incorrect credential")
    )
)]
/// Enable admin mode on the calling session.
pub async fn admin_login(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let id = session_id(&headers)?;
    Ok(Json(
        admin_gate::login(&state, id, &payload.password).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/sessions/me/admin",
    tag = "admin",
    params(("X-Session-Id" = String, Header, description = "Session id returned by POST /sessions")),
    responses((status = 200, description = "Admin mode disabled", body = SessionResponse))
)]
/// Leave admin mode on the calling session.
pub async fn admin_logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let id = session_id(&headers)?;
    Ok(Json(admin_gate::logout(&state, id).await?))
}
