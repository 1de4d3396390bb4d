//! Application startup and lifecycle management.

use crate::config::ProvisioningConfig;
use crate::services::{
    AccessCodeCipher, AuthorizationCodeExchange, EventBroadcaster, GoogleOAuthClient,
    HttpPeerReplicator, MongoStore, PeerReplicator, ProvisioningCoordinator, ProvisioningStore,
};
use crate::{build_router, AppState};
use service_core::error::AppError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Upper bound for any outbound call; replication uses its own shorter deadline.
const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against MongoDB and the configured peer and
    /// identity provider.
    pub async fn build(config: ProvisioningConfig) -> Result<Self, AppError> {
        let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;

        store.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let http = reqwest::Client::builder()
            .timeout(HTTP_CLIENT_TIMEOUT)
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        let replicator = HttpPeerReplicator::new(http.clone(), &config.replication.peer_url);
        tracing::info!(endpoint = %replicator.endpoint(), "Peer replication configured");

        let oauth = GoogleOAuthClient::new(http, config.oauth.clone());

        Self::build_with(config, Arc::new(store), Arc::new(replicator), Arc::new(oauth)).await
    }

    /// Build the application with explicitly supplied collaborators.
    pub async fn build_with(
        config: ProvisioningConfig,
        store: Arc<dyn ProvisioningStore>,
        replicator: Arc<dyn PeerReplicator>,
        oauth: Arc<dyn AuthorizationCodeExchange>,
    ) -> Result<Self, AppError> {
        let coordinator = ProvisioningCoordinator::new(
            store.clone(),
            AccessCodeCipher::new(&config.cipher.secret),
            replicator,
            oauth,
            EventBroadcaster::new(),
            config.replication.timeout,
            config.redirects.clone(),
        );

        let state = AppState {
            config: config.clone(),
            store,
            coordinator,
        };

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Provisioning service listening");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until the process is killed.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, letting in-flight requests finish.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
