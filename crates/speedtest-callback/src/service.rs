//! Callback service: the listener, the verification pipeline and the
//! invitation issuer wired together for one host

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use speedtest_core::{
    Identity, IdentityProvider, Invitation, InvitationError, InvitationIssuer, ResultVerifier,
    ScoreSink,
};

use crate::config::CallbackConfig;
use crate::error::StartError;
use crate::listener::{CallbackListener, ListenerHandle};
use crate::pipeline::ResultPipeline;
use crate::router::{create_app, RequestRouter};

/// A running callback service
///
/// Invitations issued through it point at the port the listener actually
/// bound, so they stay valid with an ephemeral port.
pub struct CallbackService {
    listener: ListenerHandle,
    issuer: InvitationIssuer,
    identities: Arc<dyn IdentityProvider>,
}

impl CallbackService {
    /// Validate `config`, bind the listener and start accepting callbacks
    pub async fn start(
        config: &CallbackConfig,
        identities: Arc<dyn IdentityProvider>,
        sink: Arc<dyn ScoreSink>,
    ) -> Result<Self, StartError> {
        config.validate()?;
        let cors = config.cors()?;

        let verifier = ResultVerifier::new(
            config.key_web.clone(),
            config.key_plugin.clone(),
            identities.clone(),
        );
        let pipeline = ResultPipeline::new(verifier, sink);
        let app = create_app(Arc::new(RequestRouter::new(Arc::new(pipeline))), &cors);

        let listener =
            CallbackListener::start(SocketAddr::new(config.bind, config.port), app).await?;

        let mut issuer = InvitationIssuer::new(config.key_plugin.clone(), config.templates());
        if let Some(ttl) = config.invitation_ttl() {
            issuer = issuer.with_ttl(ttl);
        }

        info!(
            port = listener.port(),
            callback = %issuer.templates().callback_url(listener.port()),
            "Callback service started"
        );

        Ok(Self {
            listener,
            issuer,
            identities,
        })
    }

    pub fn port(&self) -> u16 {
        self.listener.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_running()
    }

    pub fn issuer(&self) -> &InvitationIssuer {
        &self.issuer
    }

    /// Callback URL for the bound port
    pub fn callback_url(&self) -> String {
        self.issuer.templates().callback_url(self.port())
    }

    /// Issue an invitation for a requester the caller already resolved
    pub fn issue(
        &self,
        requester: &Identity,
        network_address: &str,
    ) -> Result<Invitation, InvitationError> {
        self.issuer.issue(requester, network_address, self.port())
    }

    /// Resolve `requester_id` through the host and issue an invitation
    pub async fn invite(&self, requester_id: &str) -> Result<Invitation, InvitationError> {
        self.issuer
            .invite(self.identities.as_ref(), requester_id, self.port())
            .await
    }

    /// Stop accepting and close every open connection
    pub async fn stop(self) {
        self.listener.stop().await;
    }
}
