use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Live player connections.
    pub connections: usize,
    /// Matchmaking lines with a player waiting.
    pub waiting_lines: usize,
    /// Session locks currently tracked.
    pub session_locks: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    /// Create a health response indicating the session store is unavailable.
    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            connections: 0,
            waiting_lines: 0,
            session_locks: 0,
        }
    }

    /// Attach in-process activity counters.
    pub fn with_activity(
        mut self,
        connections: usize,
        waiting_lines: usize,
        session_locks: usize,
    ) -> Self {
        self.connections = connections;
        self.waiting_lines = waiting_lines;
        self.session_locks = session_locks;
        self
    }
}
