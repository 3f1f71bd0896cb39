use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::JoinRequest,
            crate::dto::ws::JoinSessionRequest,
            crate::dto::ws::AnswerRequest,
            crate::dto::ws::MatchedPayload,
            crate::state::game::Topic,
            crate::state::game::Language,
            crate::state::game::SessionStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "WebSocket operations for quiz players"),
    )
)]
/// OpenAPI document of the service.
pub struct ApiDoc;
