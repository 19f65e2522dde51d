use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the lobby store and report degraded when it does not answer.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
