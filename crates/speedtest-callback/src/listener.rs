//! Callback listener: accept loop and lifecycle
//!
//! The accept loop hands each connection to its own worker task. Workers are
//! tracked in a [`JoinSet`] so that stopping the listener also closes every
//! open connection.

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ListenerError;
use crate::worker::serve_connection;

/// How long `stop` waits for the accept loop before aborting it
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Entry point for the callback endpoint
///
/// Binds a TCP socket and serves every accepted connection through an axum
/// app on its own task. Use [`CallbackListener::start`] and keep the returned
/// [`ListenerHandle`]; the listener runs until the handle is stopped or dropped.
pub struct CallbackListener;

impl CallbackListener {
    /// Bind `addr` and start accepting
    ///
    /// Port 0 binds an ephemeral port; read it back from the handle.
    pub async fn start(addr: SocketAddr, app: Router) -> Result<ListenerHandle, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ListenerError::LocalAddr)?;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(accept_loop(listener, app, shutdown.clone()));

        info!(addr = %local_addr, "Callback listener started");

        Ok(ListenerHandle {
            local_addr,
            shutdown,
            task: Some(task),
        })
    }
}

async fn accept_loop(listener: TcpListener, app: Router, shutdown: CancellationToken) {
    let mut workers = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    workers.spawn(serve_connection(stream, peer, app.clone()));
                }
                Err(e) => {
                    // Per-connection failures (EMFILE, aborted handshakes) must not end the loop
                    warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },

            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "Connection worker panicked");
                    }
                }
            }
        }
    }

    drop(listener);
    debug!(open = workers.len(), "Closing open connections");
    workers.shutdown().await;
}

/// Handle to a running listener
///
/// Dropping the handle signals the accept loop to stop without waiting.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The bound port
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop accepting, close every open connection and wait for both
    pub async fn stop(mut self) {
        self.shutdown.cancel();

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(STOP_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Accept loop failed"),
                Err(_) => {
                    warn!("Accept loop did not stop in time, aborting");
                    task.abort();
                }
            }
        }

        info!(addr = %self.local_addr, "Callback listener stopped");
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
