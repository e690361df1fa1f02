use std::sync::Arc;

use axum::Router;
use parley_backend::{BackendEndpoint, HttpConnector};
use parley_core::config::{AppConfig, ConfigError, LoadOptions};
use parley_core::{RequestForwarder, RuntimeConfigStore};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::routes;

pub struct Application {
    pub config: AppConfig,
    pub forwarder: RequestForwarder,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind gateway listener on `{address}`: {source}")]
    Bind { address: String, source: std::io::Error },
    #[error("gateway server stopped with error: {0}")]
    Serve(#[source] std::io::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    let connector = HttpConnector::new(BackendEndpoint::from_config(&config.backend));
    let store = RuntimeConfigStore::new(config.backend.default_runtime(), Arc::new(connector));
    info!(
        event_name = "system.bootstrap.backend_configured",
        correlation_id = "bootstrap",
        base_url = %config.backend.base_url,
        api_version = %config.backend.api_version,
        version_date = %config.backend.version_date,
        workspace_id = %config.backend.workspace_id,
        "dialog backend configured"
    );

    Application { config, forwarder: RequestForwarder::new(store) }
}

impl Application {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.config.server.bind_address, self.config.server.port)
    }

    pub fn router(&self) -> Router {
        routes::router(self.forwarder.clone(), self.config.server.body_limit_bytes)
    }

    pub async fn bind(&self) -> Result<TcpListener, BootstrapError> {
        let address = self.listen_address();
        TcpListener::bind(&address).await.map_err(|source| BootstrapError::Bind { address, source })
    }

    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BootstrapError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local_address = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.listen_address());
        info!(
            event_name = "system.server.listening",
            correlation_id = "bootstrap",
            address = %local_address,
            "gateway listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(BootstrapError::Serve)
    }
}
