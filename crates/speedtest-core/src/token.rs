//! Compact signed tokens
//!
//! Tokens are HS256 JWTs: `header.payload.signature`, each part base64url
//! without padding. The claim set is a flat JSON object of strings and numbers.
//!
//! Decoding and verification are deliberately separate operations. The result
//! protocol decodes an outer token, pulls a second token out of its claims and
//! verifies that one under a different key, which a combined decode+verify
//! cannot express.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TokenError};

/// Claim names shared with the web front-end
pub mod claim {
    /// Outer token: the invitation token, re-embedded as a string
    pub const TOKEN: &str = "token";
    /// Outer token: download speed (Mbps)
    pub const DOWN: &str = "sp_down";
    /// Outer token: upload speed (Mbps)
    pub const UP: &str = "sp_up";
    /// Outer token: round-trip latency (ms)
    pub const PING: &str = "sp_ping";
    /// Outer token: latency jitter (ms)
    pub const JITTER: &str = "sp_jitter";
    /// Inner token: network address of the requester at invitation time
    pub const NETWORK_ADDRESS: &str = "ip";
    /// Inner token: opaque requester identity
    pub const REQUESTER_ID: &str = "uuid";
    /// Registered expiry claim (seconds since the epoch)
    pub const EXPIRES_AT: &str = "exp";
}

/// Symmetric key for signing and verifying tokens
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Create a key from raw secret bytes
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Self {
        Self(secret.as_ref().to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<String> for SigningKey {
    fn from(secret: String) -> Self {
        Self(secret.into_bytes())
    }
}

impl From<&str> for SigningKey {
    fn from(secret: &str) -> Self {
        Self::from_secret(secret)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningKey").field(&"[redacted]").finish()
    }
}

/// A claim set carried by a token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A string claim; `None` if absent or not a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A numeric claim; `None` if absent or not a number
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Sign a claim set with `key`
pub fn create(claims: &Claims, key: &SigningKey) -> Result<String> {
    if key.is_empty() {
        return Err(TokenError::Signing("signing key is empty".into()));
    }

    let header = Header::new(Algorithm::HS256);
    let token = jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(key.as_bytes()))?;
    Ok(token)
}

/// Parse a token's claims without checking its signature
///
/// Never trust the result on its own. It exists so that a token nested inside
/// another token's claims can be extracted before being verified.
pub fn decode(token: &str) -> Result<Claims> {
    check_structure(token)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Check a token's signature under `key` and return its claims
///
/// `exp` and `nbf` are enforced when the token carries them; tokens without
/// them do not expire.
pub fn verify(token: &str, key: &SigningKey) -> Result<Claims> {
    check_structure(token)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_nbf = true;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Reject anything that is not three non-empty base64url segments
///
/// jsonwebtoken only checks the signature segment by comparing encodings, so
/// without this a garbage signature would surface as a signature mismatch.
fn check_structure(token: &str) -> Result<()> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    for (name, part) in ["header", "payload", "signature"].iter().zip(&parts) {
        if part.is_empty() {
            return Err(TokenError::Malformed(format!("empty {}", name)));
        }
        URL_SAFE_NO_PAD
            .decode(part)
            .map_err(|e| TokenError::Malformed(format!("{}: {}", name, e)))?;
    }

    Ok(())
}
