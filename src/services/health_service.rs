use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the session store is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_session_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "session store health check failed");
            }
        }
        Err(_) => warn!("session store unavailable (degraded mode)"),
    }

    let response = if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    };
    response.with_activity(
        state.connections().len(),
        state.pool().line_count(),
        state.sessions().lock_count(),
    )
}
