//! Error types for token handling, result verification and invitations

use thiserror::Error;

/// Result type for token operations
pub type Result<T> = std::result::Result<T, TokenError>;

/// Errors produced by the token codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The key cannot be used to sign (e.g. it is empty)
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The input is not a well-formed three-part signed token
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The signature does not match under the supplied key
    #[error("Invalid signature")]
    SignatureInvalid,

    /// A registered time claim (`exp`/`nbf`) rejects the token
    #[error("Token outside its validity window: {0}")]
    Expired(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired("token expired".into()),
            ErrorKind::ImmatureSignature => TokenError::Expired("token not yet valid".into()),
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidAlgorithmName => {
                TokenError::Signing(err.to_string())
            }
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Why a callback result was not accepted
///
/// The reason is logged by the listener and never echoed to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The outer token is not signed by the web front-end
    #[error("outer signature: {0}")]
    OuterSignature(TokenError),

    /// The embedded invitation token was not issued by this service
    #[error("inner signature: {0}")]
    InnerSignature(TokenError),

    /// One of the four measurements is absent or not a number
    #[error("missing metric: {0}")]
    MissingMetric(&'static str),

    /// A required string claim is absent
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    /// The requester in the invitation cannot be resolved by the host
    #[error("unknown requester: {0}")]
    UnknownRequester(String),

    /// The host failed while resolving or recording
    #[error("host error: {0}")]
    Host(String),
}

/// A callback payload failed verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Result rejected: {reason}")]
pub struct ResultRejected {
    pub reason: RejectReason,
}

impl From<RejectReason> for ResultRejected {
    fn from(reason: RejectReason) -> Self {
        Self { reason }
    }
}

/// Errors while building an invitation
#[derive(Error, Debug)]
pub enum InvitationError {
    /// The invitation token could not be signed
    #[error("Invitation failed: {0}")]
    Signing(#[from] TokenError),

    /// A configured URL template does not produce a valid URL
    #[error("Invalid invitation URL: {0}")]
    InvalidUrl(String),

    /// The host could not supply the requester or their address
    #[error("Invitation failed: {0}")]
    Host(#[from] HostError),
}

impl From<url::ParseError> for InvitationError {
    fn from(err: url::ParseError) -> Self {
        InvitationError::InvalidUrl(err.to_string())
    }
}

/// Errors reported by host capabilities
#[derive(Error, Debug, Clone)]
pub enum HostError {
    #[error("Requester not found: {0}")]
    NotFound(String),

    #[error("Score storage error: {0}")]
    Storage(String),
}
