//! Per-connection worker
//!
//! Serves HTTP/1.1 requests on one accepted socket, with keep-alive, until
//! the client goes away or the task is aborted.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::error::Error as _;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use axum::extract::ConnectInfo;
use axum::Router;

/// Serve one connection through `app`
pub async fn serve_connection(stream: TcpStream, peer: SocketAddr, app: Router) {
    debug!(peer = %peer, "Accepted connection");

    let io = TokioIo::new(stream);
    let service = service_fn(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(peer));
        app.clone().oneshot(req)
    });

    let result = http1::Builder::new()
        .keep_alive(true)
        .serve_connection(io, service)
        .await;

    match result {
        Ok(()) => info!(peer = %peer, "Client closed connection"),
        Err(e) if client_went_away(&e) => info!(peer = %peer, "Client closed connection"),
        Err(e) if e.is_parse() => warn!(peer = %peer, error = %e, "Malformed request"),
        Err(e) => error!(peer = %peer, error = %e, "Connection failed"),
    }
}

/// EOF mid-request, or the socket was reset under us
fn client_went_away(e: &hyper::Error) -> bool {
    if e.is_incomplete_message() || e.is_closed() || e.is_canceled() {
        return true;
    }

    let mut source = e.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = cause.source();
    }
    false
}
