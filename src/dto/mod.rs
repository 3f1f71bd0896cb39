/// Health check responses.
pub mod health;
/// Custom field validators.
pub mod validation;
/// WebSocket messages.
pub mod ws;
