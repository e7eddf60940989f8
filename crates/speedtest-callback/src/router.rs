//! Request routing for the callback endpoint
//!
//! One route (`/`), two methods (`GET` health check, `POST` submission) and
//! CORS preflight. Every response carries the same CORS and accept headers and
//! a plain-text `OK` / `NG\n<reason>` body that the web front-end parses.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::pipeline::SubmissionHandler;

/// The only registered route
pub const ROUTE: &str = "/";

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Authorization, Content-Type";
/// Preflight cache lifetime (seconds)
pub const MAX_AGE: &str = "86400";

/// Status and body for one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: &'static str,
}

impl Reply {
    pub const PREFLIGHT: Reply = Reply::new(StatusCode::NO_CONTENT, "");
    pub const OK: Reply = Reply::new(StatusCode::OK, "OK");
    pub const NOT_FOUND: Reply = Reply::new(StatusCode::NOT_FOUND, "NG\nNot Found");
    pub const METHOD_NOT_ALLOWED: Reply =
        Reply::new(StatusCode::METHOD_NOT_ALLOWED, "NG\nMethod Not Allowed");
    pub const NO_REQUEST_DATA: Reply = Reply::new(StatusCode::BAD_REQUEST, "NG\nNo Request Data");
    pub const NO_DATA: Reply = Reply::new(StatusCode::BAD_REQUEST, "NG\nNo Data");
    pub const INVALID_DATA: Reply = Reply::new(StatusCode::BAD_REQUEST, "NG\nInvalid Data");

    const fn new(status: StatusCode, body: &'static str) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        if self.body.is_empty() {
            self.status.into_response()
        } else {
            (self.status, self.body).into_response()
        }
    }
}

/// Headers stamped on every response
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(allow_origin: &str) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(allow_origin)?,
        })
    }

    pub fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        vec![
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone()),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS)),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)),
            (header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE)),
            (header::ACCEPT, HeaderValue::from_static("text/plain")),
            (header::ACCEPT_CHARSET, HeaderValue::from_static("utf-8")),
        ]
    }
}

/// Maps one request to one reply
///
/// Stateless across requests; the only collaborator is the submission
/// capability.
pub struct RequestRouter {
    submissions: Arc<dyn SubmissionHandler>,
}

impl RequestRouter {
    pub fn new(submissions: Arc<dyn SubmissionHandler>) -> Self {
        Self { submissions }
    }

    /// Route a request. `target` is the request target as sent (path and query).
    pub async fn route(&self, method: &Method, target: &str, body: &[u8], peer: IpAddr) -> Reply {
        if is_method(method, &Method::OPTIONS) {
            debug!(peer = %peer, "Preflight");
            return Reply::PREFLIGHT;
        }

        info!(url = %target, method = %method, peer = %peer, "Callback request");

        if target != ROUTE {
            warn!(url = %target, "Invalid Request: Not Found");
            return Reply::NOT_FOUND;
        }

        if is_method(method, &Method::GET) {
            return Reply::OK;
        }

        if !is_method(method, &Method::POST) {
            warn!(method = %method, "Invalid Request: Method Not Allowed");
            return Reply::METHOD_NOT_ALLOWED;
        }

        if body.is_empty() {
            warn!(peer = %peer, "Invalid Request: No Request Data");
            return Reply::NO_REQUEST_DATA;
        }

        let Ok(payload) = std::str::from_utf8(body) else {
            warn!(peer = %peer, "Invalid Request: No Data");
            return Reply::NO_DATA;
        };

        match self.submissions.submit(payload.trim(), peer).await {
            Ok(()) => Reply::OK,
            Err(e) => {
                warn!(peer = %peer, reason = %e, "Invalid Request: Invalid Data");
                Reply::INVALID_DATA
            }
        }
    }
}

/// Method names are compared case-insensitively
fn is_method(method: &Method, expected: &Method) -> bool {
    method.as_str().eq_ignore_ascii_case(expected.as_str())
}

/// Axum app serving every request through `router`
///
/// Requests must carry `ConnectInfo<SocketAddr>` in their extensions; the
/// connection worker inserts it. Bodies are buffered without a size limit so
/// every request ends in one of the router's replies.
pub fn create_app(router: Arc<RequestRouter>, cors: &CorsPolicy) -> Router {
    let mut app = Router::new()
        .fallback(callback)
        .with_state(router)
        .layer(DefaultBodyLimit::disable());

    for (name, value) in cors.headers() {
        app = app.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    app.layer(TraceLayer::new_for_http())
}

async fn callback(
    State(router): State<Arc<RequestRouter>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Reply {
    let target = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    match body {
        Ok(body) => router.route(&method, target, &body, peer.ip()).await,
        // preflight never looks at the body
        Err(_) if is_method(&method, &Method::OPTIONS) => Reply::PREFLIGHT,
        Err(e) => {
            warn!(peer = %peer, error = %e, "Invalid Request: Invalid Data");
            Reply::INVALID_DATA
        }
    }
}
