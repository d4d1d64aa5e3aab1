use anyhow::{Context, Result};
use std::sync::Arc;
use thedata_server::broker::NatsConnector;
use thedata_server::config::ServiceConfig;
use thedata_server::service::ServiceContext;

/// Run the liveness service until Ctrl+C or SIGTERM.
pub fn run(host: &str, port: u16) -> Result<()> {
    let config = ServiceConfig::from_env();
    tracing::debug!(?config, "loaded service configuration");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .with_context(|| format!("failed to bind {host}:{port}"))?;
        let service = Arc::new(ServiceContext::new(config, Arc::new(NatsConnector)));
        thedata_server::serve_on(listener, service).await
    })
}
