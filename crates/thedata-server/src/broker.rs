//! Broker connection seam.
//!
//! [`BrokerConnector`] opens the single connection the service owns and
//! [`BrokerConnection`] is the handle it keeps. The NATS implementations
//! wrap `async-nats`; tests substitute their own.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use async_nats::connection::State;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Current connection status as reported by the client.
    fn is_connected(&self) -> bool;

    /// Release the connection. Called at most once, during shutdown.
    async fn close(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(
        &self,
        config: &ServiceConfig,
    ) -> Result<Arc<dyn BrokerConnection>, ServiceError>;
}

// ---------------------------------------------------------------------------
// NATS
// ---------------------------------------------------------------------------

const CONNECTION_NAME: &str = "thedata";

/// Connects with `async-nats`. A failed first attempt is returned as an
/// error; the client is not asked to retry it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NatsConnector;

#[async_trait]
impl BrokerConnector for NatsConnector {
    async fn connect(
        &self,
        config: &ServiceConfig,
    ) -> Result<Arc<dyn BrokerConnection>, ServiceError> {
        let mut options = async_nats::ConnectOptions::new().name(CONNECTION_NAME);
        if let Some(token) = &config.nats_auth_token {
            options = options.token(token.clone());
        }

        let client = options
            .connect(config.nats_url.as_str())
            .await
            .map_err(|e| ServiceError::BrokerConnect {
                url: config.nats_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Arc::new(NatsConnection { client }))
    }
}

pub struct NatsConnection {
    client: async_nats::Client,
}

#[async_trait]
impl BrokerConnection for NatsConnection {
    fn is_connected(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }

    // Flush pending publishes; the socket closes when the last client
    // handle is dropped.
    async fn close(&self) -> Result<(), ServiceError> {
        self.client
            .flush()
            .await
            .map_err(|e| ServiceError::BrokerClose(e.to_string()))
    }
}
