//! Error types for the callback listener

use std::net::SocketAddr;
use thiserror::Error;

use speedtest_core::{HostError, InvitationError, ResultRejected};

/// Listener start-up errors
#[derive(Error, Debug)]
pub enum ListenerError {
    /// The socket could not be bound (port in use, permission denied)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read bound address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },

    #[error("Signing key {0} is empty")]
    EmptyKey(&'static str),

    #[error("Invalid URL template: {0}")]
    Templates(#[from] InvitationError),
}

/// Errors starting the callback service
#[derive(Error, Debug)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// A callback submission was not accepted
///
/// Only ever logged; callers see a generic `NG` body.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Rejected(#[from] ResultRejected),

    #[error("Score sink failed: {0}")]
    Sink(#[from] HostError),
}
