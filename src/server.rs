//! Server lifecycle: an explicit start/stop handle, no ambient singleton.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{self, AppState};

/// A running dashboard server. Dropping the handle without calling
/// [`ServerHandle::stop`] leaves the server running until the process exits.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// The address the server actually bound (useful with port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal graceful shutdown and wait for in-flight requests to drain.
    pub async fn stop(self) -> Result<()> {
        // The receiver is gone only if the serve task already exited.
        let _ = self.shutdown.send(());
        self.task
            .await
            .context("joining server task")?
            .context("server error")?;
        Ok(())
    }
}

/// Bind `host:port` and serve the dashboard API until the handle is stopped.
pub async fn start(host: &str, port: u16, state: AppState) -> Result<ServerHandle> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    let listener = TcpListener::bind(addr).await.context("binding to address")?;
    let addr = listener.local_addr().context("reading bound address")?;

    let app = api::create_router(state);
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    info!("Listening on http://{}", addr);

    Ok(ServerHandle {
        addr,
        shutdown,
        task,
    })
}
