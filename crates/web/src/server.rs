//! Server startup and the accept loop.
//!
//! One task is spawned per accepted connection, it runs an
//! [`HttpConnection`] against the shared [`Router`]. On shutdown the listener is
//! closed first, then in-flight connections get a grace period before the
//! remaining ones are aborted.

use std::io;
use std::sync::Arc;

use aquarius_http::connection::HttpConnection;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::router::Router;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("router must be set")]
    MissingRouter,

    #[error("can't bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Default)]
pub struct ServerBuilder {
    router: Option<Router>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the listen address of the current configuration
    pub fn bind(mut self, address: impl Into<String>) -> Self {
        self.config = self.config.with_address(address);
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let router = self.router.ok_or(ServerError::MissingRouter)?;
        Ok(Server { router: Arc::new(router), config: self.config })
    }
}

#[derive(Debug)]
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let address = self.config.address().to_string();
        let tcp_listener = match TcpListener::bind(&address).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, %address, "bind server error");
                return Err(ServerError::Bind { address, source: e });
            }
        };

        self.serve(tcp_listener, shutdown_signal()).await
    }

    /// Serves connections accepted on `tcp_listener` until `shutdown` completes.
    pub async fn serve<F>(self, tcp_listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let local_addr = tcp_listener.local_addr()?;
        info!(address = %local_addr, routes = self.router.len(), "start listening");
        for line in self.router.to_string().lines() {
            info!("route {line}");
        }

        let options = self.config.connection_options();
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received, stop accepting connections");
                    break;
                }

                accepted = tcp_listener.accept() => {
                    let (tcp_stream, remote_addr) = match accepted {
                        Ok(stream_and_addr) => stream_and_addr,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };

                    let router = Arc::clone(&self.router);
                    connections.spawn(async move {
                        let (reader, writer) = tcp_stream.into_split();
                        let connection = HttpConnection::with_options(reader, writer, options);
                        match connection.process(router).await {
                            Ok(()) => debug!(%remote_addr, "connection closed"),
                            Err(e) => warn!(%remote_addr, cause = %e, "connection closed with error"),
                        }
                    });
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => log_join(joined),
            }
        }

        drop(tcp_listener);
        self.drain(connections).await;
        info!("server stopped");
        Ok(())
    }

    async fn drain(&self, mut connections: JoinSet<()>) {
        if connections.is_empty() {
            return;
        }

        let grace = self.config.shutdown_grace();
        info!(in_flight = connections.len(), ?grace, "waiting for in-flight connections");

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = connections.join_next().await {
                log_join(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(remaining = connections.len(), "grace period elapsed, aborting remaining connections");
            connections.shutdown().await;
        }
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(cause = %e, "connection task panicked");
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received"),
        Err(e) => {
            error!(cause = %e, "can't listen for ctrl-c, serving until the process is stopped");
            std::future::pending::<()>().await;
        }
    }
}
