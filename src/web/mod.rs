//! HTTP API for cdripd.
//!
//! ## Architecture
//!
//! - `routes`: Axum router wiring paths to handlers
//! - `handlers`: request validation and calls into `core`
//! - `error`: mapping of domain failures to status codes and JSON bodies
//!
//! ## Endpoints
//!
//! - `GET  /drives/list` - Current drive catalog
//! - `POST /drives/update` - Rebuild the catalog
//! - `GET  /drives/{device}/discid` - Identify the disc in a drive
//! - `POST /drives/{device}/rip/track/{track}` - Rip one track
//! - `POST /drives/{device}/rip/cd` - Rip every track of the disc
//! - `POST /drives/{device}/eject` - Open the tray
//! - `POST /drives/{device}/analyze` - Run the drive self-test

pub mod error;
pub mod handlers;
pub mod routes;

use std::net::SocketAddr;
use tokio::sync::broadcast;

use crate::context::AppContext;

pub use error::HttpError;
pub use routes::create_router;

/// HTTP server for the drive API.
pub struct WebServer {
    bind_addr: SocketAddr,
    ctx: AppContext,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebServer {
    pub fn new(ctx: AppContext, bind_addr: SocketAddr) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            bind_addr,
            ctx,
            shutdown_tx,
        }
    }

    /// Start the web server. Runs until shutdown() is called.
    pub async fn start(&self) -> anyhow::Result<()> {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "Drive API listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
