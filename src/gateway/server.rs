//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::router::{AppState, create_router};
use crate::config::Config;
use crate::idp::IdpClient;
use crate::{Error, Result};

/// IdP gateway server
pub struct Gateway {
    /// Configuration
    config: Arc<Config>,
    /// IdP admin client, shared by every handler
    idp: IdpClient,
}

impl Gateway {
    /// Create a new gateway.
    ///
    /// # Errors
    ///
    /// Returns an error when the shared HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        let idp = IdpClient::new(http, config.idp.clone());
        Ok(Self {
            config: Arc::new(config),
            idp,
        })
    }

    /// Run the gateway until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error when the listen address is invalid, the listener
    /// cannot bind, or the server fails.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let state = Arc::new(AppState {
            config: Arc::clone(&self.config),
            idp: self.idp,
        });
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("IDP GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(idp = %self.config.idp.url, realm = %self.config.idp.realm, "IdP endpoint");
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
