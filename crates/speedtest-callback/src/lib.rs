//! # Speed-test callback listener
//!
//! Embedded HTTP/1.1 endpoint that receives signed speed-test results from the
//! web front-end, verifies them with [`speedtest_core::ResultVerifier`] and
//! hands accepted results to the host.
//!
//! ```text
//! OPTIONS *        -> 204 (CORS preflight)
//! GET     /        -> 200 OK
//! POST    /        -> 200 OK | 400 NG\n<reason>
//! anything else    -> 404 / 405
//! ```
//!
//! [`CallbackService`] bundles the listener with an invitation issuer that
//! knows the bound port; [`MemoryScoreboard`] is an in-memory host for
//! development and tests.

pub mod config;
pub mod error;
pub mod listener;
pub mod pipeline;
pub mod router;
pub mod scores;
pub mod service;
pub mod worker;

pub use config::CallbackConfig;
pub use error::{ConfigError, ListenerError, StartError, SubmissionError};
pub use listener::{CallbackListener, ListenerHandle};
pub use pipeline::{ResultPipeline, SubmissionHandler};
pub use router::{create_app, CorsPolicy, Reply, RequestRouter};
pub use scores::{MemoryScoreboard, ScoreRow};
pub use service::CallbackService;
