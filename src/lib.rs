//! Library crate for sharequiz-back, exposing modules for the binary and integration tests.

/// Application configuration loaded from JSON.
pub mod config;
/// Persistence: session stores, session records and question sources.
pub mod dao;
/// Wire types exchanged with clients.
pub mod dto;
/// Service error taxonomy.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared in-process state and the session domain model.
pub mod state;
