use utoipa::OpenApi;

/// OpenAPI document for every public route.
#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Club Pick Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::board::get_board,
        crate::routes::session::open_session,
        crate::routes::session::current_session,
        crate::routes::session::rename,
        crate::routes::session::logout,
        crate::routes::session::select_club,
        crate::routes::session::admin_login,
        crate::routes::session::admin_logout,
        crate::routes::admin::list_selections,
        crate::routes::admin::delete_selection,
        crate::routes::admin::update_limit,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::board::BoardResponse,
            crate::dto::board::ClubCard,
            crate::dto::board::LimitStatus,
            crate::dto::session::DisplayNameRequest,
            crate::dto::session::SessionResponse,
            crate::dto::session::SelectClubRequest,
            crate::dto::session::SelectionSummary,
            crate::dto::admin::AdminLoginRequest,
            crate::dto::admin::UpdateLimitRequest,
            crate::dto::admin::AdminSelectionRow,
            crate::dto::admin::AdminDashboardResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::SelectionsChangedEvent,
            crate::dto::sse::ConfigChangedEvent,
            crate::state::Participation,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "board", description = "Club grid"),
        (name = "sessions", description = "Display names and club picks"),
        (name = "admin", description = "Admin gate and moderation"),
    )
)]
pub struct ApiDoc;
