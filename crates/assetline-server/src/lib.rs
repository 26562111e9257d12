//! Preview server for Assetline.
//!
//! Serves the output directory over HTTP and pushes reload signals to open
//! pages:
//!
//! - `GET /*` serves files below the output root. Directories resolve to
//!   `index.html`, extensionless paths fall back to `<path>.html`.
//! - HTML responses get the reload client injected before `</body>`.
//! - `GET /__assetline/client.js` serves the client script.
//! - `GET /__assetline/ws` is the WebSocket the client listens on.
//!
//! Pipelines reach connected pages through a [`LiveReloadHub`], which
//! implements [`assetline_pipeline::ReloadSink`].
//!
//! # Quick Start
//!
//! ```ignore
//! use assetline_server::{LiveReloadHub, Server, ServerConfig, shutdown_signal};
//!
//! let hub = LiveReloadHub::new();
//! let server = Server::bind(ServerConfig::default(), Some(hub.clone())).await?;
//! println!("Serving at http://{}", server.local_addr()?);
//! server.serve(shutdown_signal()).await?;
//! ```

mod app;
mod error;
mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

pub use error::ServerError;
pub use live_reload::{LiveReloadHub, ReloadEvent};
use state::AppState;

/// URL prefix of the server's own endpoints.
pub const INTERNAL_PREFIX: &str = "/__assetline";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (`0` picks a free port).
    pub port: u16,
    /// Directory to serve.
    pub root: PathBuf,
    /// Inject the reload client and accept WebSocket connections.
    pub live_reload_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            root: PathBuf::from("dest"),
            live_reload_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Server settings from loaded configuration. The served root is the
    /// project's output directory.
    #[must_use]
    pub fn from_config(config: &assetline_config::Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            root: config.path_table.dest.clone(),
            live_reload_enabled: config.server.live_reload,
        }
    }
}

/// A bound, not yet running, preview server.
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// The hub is only wired in when live reload is enabled.
    pub async fn bind(config: ServerConfig, hub: Option<LiveReloadHub>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                address: format!("{}:{}", config.host, config.port),
                source,
            })?;

        let state = Arc::new(AppState {
            root: config.root,
            live_reload: hub.filter(|_| config.live_reload_enabled),
        });
        Ok(Self {
            listener,
            router: app::create_router(state),
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(address = %self.local_addr()?, "Starting preview server");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Bind and serve until Ctrl-C.
pub async fn run_server(config: ServerConfig, hub: Option<LiveReloadHub>) -> Result<(), ServerError> {
    Server::bind(config, hub).await?.serve(shutdown_signal()).await
}

/// Wait for Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let temp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            port: 0,
            root: temp.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let server = Server::bind(config, None).await.unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };

        let err = Server::bind(config, None).await.err().unwrap();

        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }

    #[test]
    fn test_from_config_serves_output_root() {
        let temp = tempfile::tempdir().unwrap();
        let config = assetline_config::Config::default_with_base(temp.path());

        let server = ServerConfig::from_config(&config);

        assert_eq!(server.root, temp.path().join("dest"));
        assert_eq!(server.port, 3000);
        assert!(server.live_reload_enabled);
    }
}
