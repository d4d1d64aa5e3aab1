//! Connection lifecycle and liveness for the service.
//!
//! Transitions: `Uninitialized → Connecting → Connected → Closed`, or
//! `Connecting → ConnectFailed` if the startup attempt fails.
//!
//! [`ServiceContext::startup`] is the only writer before the HTTP server
//! starts and [`ServiceContext::shutdown`] the only writer after it stops;
//! probes in between only read.

use crate::broker::{BrokerConnection, BrokerConnector};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Connecting,
    Connected,
    Closed,
    ConnectFailed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::ConnectFailed => "connect_failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Healthy,
    Unhealthy {
        state: LifecycleState,
        broker_connected: bool,
    },
}

impl Liveness {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

struct Inner {
    state: LifecycleState,
    connection: Option<Arc<dyn BrokerConnection>>,
}

/// Owns the service's single broker connection.
pub struct ServiceContext {
    config: ServiceConfig,
    connector: Arc<dyn BrokerConnector>,
    inner: RwLock<Inner>,
}

impl ServiceContext {
    pub fn new(config: ServiceConfig, connector: Arc<dyn BrokerConnector>) -> Self {
        Self {
            config,
            connector,
            inner: RwLock::new(Inner {
                state: LifecycleState::Uninitialized,
                connection: None,
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.read().await.state
    }

    /// Open the broker connection. Fails if the broker cannot be reached or
    /// if startup already ran; a failure is terminal for this context.
    pub async fn startup(&self) -> Result<(), ServiceError> {
        {
            let mut inner = self.inner.write().await;
            if inner.state != LifecycleState::Uninitialized {
                return Err(ServiceError::AlreadyStarted(inner.state));
            }
            inner.state = LifecycleState::Connecting;
        }

        // The lock is released while connecting so probes answer at once.
        tracing::info!(url = %self.config.nats_url, "connecting to NATS");
        let result = self.connector.connect(&self.config).await;

        let mut inner = self.inner.write().await;
        match result {
            Ok(connection) => {
                inner.connection = Some(connection);
                inner.state = LifecycleState::Connected;
                tracing::info!("Successfully connected to NATS");
                Ok(())
            }
            Err(e) => {
                inner.state = LifecycleState::ConnectFailed;
                tracing::error!("Failed to connect to NATS: {e}");
                Err(e)
            }
        }
    }

    /// Release the broker connection if one is held. Without a connection
    /// this does nothing.
    pub async fn shutdown(&self) {
        let connection = {
            let mut inner = self.inner.write().await;
            let taken = inner.connection.take();
            if taken.is_some() {
                inner.state = LifecycleState::Closed;
            }
            taken
        };

        let Some(connection) = connection else {
            tracing::debug!("no NATS connection to close");
            return;
        };

        if let Err(e) = connection.close().await {
            tracing::warn!("error while closing NATS connection: {e}");
        }
        drop(connection);
        tracing::info!("Closed NATS connection");
    }

    /// Healthy only while a connection is held and reports connected. Never
    /// reconnects.
    pub async fn probe(&self) -> Liveness {
        let inner = self.inner.read().await;
        let broker_connected = inner
            .connection
            .as_ref()
            .is_some_and(|c| c.is_connected());
        if broker_connected {
            Liveness::Healthy
        } else {
            Liveness::Unhealthy {
                state: inner.state,
                broker_connected,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeConnection {
        connected: Arc<AtomicBool>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrokerConnection for FakeConnection {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn close(&self) -> Result<(), ServiceError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        fail: bool,
        connected: Arc<AtomicBool>,
        closes: Arc<AtomicUsize>,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl BrokerConnector for FakeConnector {
        async fn connect(
            &self,
            config: &ServiceConfig,
        ) -> Result<Arc<dyn BrokerConnection>, ServiceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ServiceError::BrokerConnect {
                    url: config.nats_url.clone(),
                    reason: "connection refused".into(),
                });
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(Arc::new(FakeConnection {
                connected: self.connected.clone(),
                closes: self.closes.clone(),
            }))
        }
    }

    fn context(connector: Arc<FakeConnector>) -> ServiceContext {
        ServiceContext::new(ServiceConfig::default(), connector)
    }

    #[tokio::test]
    async fn unhealthy_before_startup() {
        let ctx = context(Arc::new(FakeConnector::default()));
        assert_eq!(
            ctx.probe().await,
            Liveness::Unhealthy {
                state: LifecycleState::Uninitialized,
                broker_connected: false,
            }
        );
    }

    #[tokio::test]
    async fn healthy_iff_connection_reports_connected() {
        let connector = Arc::new(FakeConnector::default());
        let ctx = context(connector.clone());
        ctx.startup().await.unwrap();
        assert_eq!(ctx.state().await, LifecycleState::Connected);
        assert!(ctx.probe().await.is_healthy());

        connector.connected.store(false, Ordering::SeqCst);
        assert_eq!(
            ctx.probe().await,
            Liveness::Unhealthy {
                state: LifecycleState::Connected,
                broker_connected: false,
            }
        );

        // Probing never reconnects.
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        connector.connected.store(true, Ordering::SeqCst);
        assert!(ctx.probe().await.is_healthy());
    }

    #[tokio::test]
    async fn unhealthy_after_shutdown() {
        let connector = Arc::new(FakeConnector::default());
        let ctx = context(connector.clone());
        ctx.startup().await.unwrap();
        ctx.shutdown().await;

        assert_eq!(ctx.state().await, LifecycleState::Closed);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
        // Even if the broker flag flips back, no handle is held any more.
        connector.connected.store(true, Ordering::SeqCst);
        assert!(!ctx.probe().await.is_healthy());
    }

    #[tokio::test]
    async fn shutdown_without_connection_is_noop() {
        let connector = Arc::new(FakeConnector::default());
        let ctx = context(connector.clone());
        ctx.shutdown().await;
        assert_eq!(ctx.state().await, LifecycleState::Uninitialized);

        ctx.startup().await.unwrap();
        ctx.shutdown().await;
        ctx.shutdown().await;
        assert_eq!(ctx.state().await, LifecycleState::Closed);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_startup_is_terminal() {
        let connector = Arc::new(FakeConnector {
            fail: true,
            ..FakeConnector::default()
        });
        let ctx = context(connector.clone());

        let err = ctx.startup().await.unwrap_err();
        assert!(matches!(err, ServiceError::BrokerConnect { .. }));
        assert_eq!(ctx.state().await, LifecycleState::ConnectFailed);
        assert!(!ctx.probe().await.is_healthy());

        let err = ctx.startup().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::AlreadyStarted(LifecycleState::ConnectFailed)
        ));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_startup_keeps_single_connection() {
        let connector = Arc::new(FakeConnector::default());
        let ctx = context(connector.clone());
        ctx.startup().await.unwrap();
        assert!(matches!(
            ctx.startup().await,
            Err(ServiceError::AlreadyStarted(LifecycleState::Connected))
        ));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert!(ctx.probe().await.is_healthy());
    }

    #[tokio::test]
    async fn concurrent_probes_agree() {
        let ctx = Arc::new(context(Arc::new(FakeConnector::default())));
        ctx.startup().await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move { ctx.probe().await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_healthy());
        }
    }
}
