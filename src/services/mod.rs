/// OpenAPI documentation generation.
pub mod documentation;
/// Player-facing event delivery.
pub mod events;
/// Health check service.
pub mod health_service;
/// Matchmaking line entry and exit.
pub mod matchmaking_service;
/// Session lifecycle: creation, joins, answers and disconnects.
pub mod session_service;
/// Session store connection supervision and degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
