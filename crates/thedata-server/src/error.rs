use crate::service::LifecycleState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to connect to NATS at {url}: {reason}")]
    BrokerConnect { url: String, reason: String },

    #[error("failed to close NATS connection: {0}")]
    BrokerClose(String),

    #[error("service already started (state: {0})")]
    AlreadyStarted(LifecycleState),

    #[error("NATS connection is not available")]
    Unavailable {
        state: LifecycleState,
        broker_connected: bool,
    },
}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Some(e) = self.0.downcast_ref::<ServiceError>() else {
            let body = serde_json::json!({ "error": self.0.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
        };

        let (status, body) = match e {
            ServiceError::Unavailable {
                state,
                broker_connected,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": e.to_string(),
                    "state": state,
                    "broker_connected": broker_connected,
                }),
            ),
            ServiceError::AlreadyStarted(_) => {
                (StatusCode::CONFLICT, serde_json::json!({ "error": e.to_string() }))
            }
            ServiceError::BrokerConnect { .. } | ServiceError::BrokerClose(_) => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": e.to_string() }),
            ),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_maps_to_503() {
        let err = AppError::from(ServiceError::Unavailable {
            state: LifecycleState::Uninitialized,
            broker_connected: false,
        });
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn already_started_maps_to_409() {
        let err = AppError::from(ServiceError::AlreadyStarted(LifecycleState::Connected));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn broker_connect_maps_to_502() {
        let err = AppError::from(ServiceError::BrokerConnect {
            url: "nats://localhost:4222".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unknown_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("boom"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
