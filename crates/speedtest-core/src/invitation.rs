//! Invitation issuance
//!
//! An invitation is a URL to the speed-test front-end carrying the requester's
//! display name, the callback URL of the embedded listener and a token signed
//! with the plugin key. The front-end echoes the token back inside its signed
//! result.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::{HostError, InvitationError};
use crate::host::{Identity, IdentityProvider};
use crate::token::{self, claim, Claims, SigningKey};

/// Placeholder for the live listener port in the callback template
pub const PORT_PLACEHOLDER: &str = "{port}";

/// URL templates for invitations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationTemplates {
    /// Speed-test front-end, e.g. `https://speedtest.example.com/`
    pub entry_point: String,

    /// Callback URL with a `{port}` placeholder, e.g. `http://play.example.com:{port}/`
    pub callback_point: String,
}

impl InvitationTemplates {
    pub fn new(entry_point: impl Into<String>, callback_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            callback_point: callback_point.into(),
        }
    }

    /// Callback URL for a listener bound to `port`
    pub fn callback_url(&self, port: u16) -> String {
        self.callback_point.replace(PORT_PLACEHOLDER, &port.to_string())
    }

    /// Both templates must yield absolute URLs
    pub fn validate(&self) -> Result<(), InvitationError> {
        Url::parse(&self.entry_point)?;
        Url::parse(&self.callback_url(0))?;
        Ok(())
    }
}

/// An issued invitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub requester_id: String,
    /// Token carrying the requester id and network address
    pub token: String,
    /// URL handed to the requester
    pub url: String,
}

/// Issues invitations signed with the plugin key
#[derive(Debug, Clone)]
pub struct InvitationIssuer {
    plugin_key: SigningKey,
    templates: InvitationTemplates,
    ttl: Option<chrono::Duration>,
}

impl InvitationIssuer {
    pub fn new(plugin_key: SigningKey, templates: InvitationTemplates) -> Self {
        Self {
            plugin_key,
            templates,
            ttl: None,
        }
    }

    /// Expire invitation tokens after `ttl`
    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn templates(&self) -> &InvitationTemplates {
        &self.templates
    }

    /// Issue an invitation for `requester`, who is reachable at `network_address`
    pub fn issue(
        &self,
        requester: &Identity,
        network_address: &str,
        callback_port: u16,
    ) -> Result<Invitation, InvitationError> {
        let mut claims = Claims::new()
            .with(claim::NETWORK_ADDRESS, network_address)
            .with(claim::REQUESTER_ID, requester.id.as_str());
        if let Some(ttl) = self.ttl {
            claims.insert(claim::EXPIRES_AT, (Utc::now() + ttl).timestamp());
        }

        let token = token::create(&claims, &self.plugin_key).map_err(|e| {
            warn!(requester = %requester.id, error = %e, "Invitation token signing failed");
            InvitationError::from(e)
        })?;

        let mut url = Url::parse(&self.templates.entry_point)?;
        url.query_pairs_mut()
            .append_pair("name", &requester.display_name)
            .append_pair("callback", &self.templates.callback_url(callback_port))
            .append_pair("token", &token);

        info!(
            requester = %requester.id,
            address = %network_address,
            port = callback_port,
            "Issued invitation"
        );

        Ok(Invitation {
            requester_id: requester.id.clone(),
            token,
            url: url.into(),
        })
    }

    /// Look the requester up through the host, then issue
    pub async fn invite(
        &self,
        identities: &dyn IdentityProvider,
        requester_id: &str,
        callback_port: u16,
    ) -> Result<Invitation, InvitationError> {
        let requester = identities
            .resolve(requester_id)
            .await?
            .ok_or_else(|| HostError::NotFound(requester_id.to_string()))?;
        let address = identities
            .network_address(requester_id)
            .await?
            .ok_or_else(|| HostError::NotFound(format!("{} has no network address", requester_id)))?;

        self.issue(&requester, &address, callback_port)
    }
}
