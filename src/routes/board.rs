use axum::{Json, Router, extract::State, http::HeaderMap, routing::get};

use crate::{
    dto::board::BoardResponse, error::AppError, routes::optional_session_id,
    services::board_service, state::SharedState,
};

/// Club grid endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route("/board", get(get_board))
}

#[utoipa::path(
    get,
    path = "/board",
    tag = "board",
    params(("X-Session-Id" = Option<String>, Header, description = "Session id; omit to view the board anonymously")),
    responses(
        (status = 200, description = "Club grid and limit status", body = BoardResponse),
        (status = 401, description = "Unknown session")
    )
)]
/// Return the club grid and limit figures as seen by the calling session.
pub async fn get_board(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<BoardResponse>, AppError> {
    let viewer = match optional_session_id(&headers)? {
        Some(id) => Some(state.require_session(id)?),
        None => None,
    };
    Ok(Json(board_service::board_for(&state, viewer.as_ref()).await))
}
