use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, ServiceError};
use crate::service::Liveness;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /health — 200 while the broker connection is up, 503 otherwise.
pub async fn health_check(State(app): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    match app.service.probe().await {
        Liveness::Healthy => Ok(Json(HealthResponse {
            status: "healthy",
            message: "API is running",
        })),
        Liveness::Unhealthy {
            state,
            broker_connected,
        } => {
            tracing::debug!(%state, broker_connected, "liveness probe failed");
            Err(ServiceError::Unavailable {
                state,
                broker_connected,
            }
            .into())
        }
    }
}
