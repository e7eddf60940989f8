//! Result Chain Scenario Tests
//!
//! End-to-end runs of invitation → front-end result → verification, and the
//! forgery and replay attempts the two-layer check must block.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use speedtest_core::token::{self, claim, Claims, SigningKey};
use speedtest_core::{
    HostError, Identity, IdentityProvider, InvitationIssuer, InvitationTemplates, RejectReason,
    ResultVerifier, TokenError,
};

// =============================================================================
// Test Helpers
// =============================================================================

const PLUGIN_KEY: &str = "k1";
const WEB_KEY: &str = "k2";

struct Directory {
    users: HashMap<String, (Identity, String)>,
}

impl Directory {
    fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            "alice".to_string(),
            (Identity::new("alice", "Alice"), "1.2.3.4".to_string()),
        );
        users.insert(
            "bob".to_string(),
            (Identity::new("bob", "Bob"), "9.9.9.9".to_string()),
        );
        Self { users }
    }
}

#[async_trait]
impl IdentityProvider for Directory {
    async fn resolve(&self, requester_id: &str) -> Result<Option<Identity>, HostError> {
        Ok(self.users.get(requester_id).map(|(identity, _)| identity.clone()))
    }

    async fn network_address(&self, requester_id: &str) -> Result<Option<String>, HostError> {
        Ok(self.users.get(requester_id).map(|(_, address)| address.clone()))
    }
}

fn issuer() -> InvitationIssuer {
    InvitationIssuer::new(
        SigningKey::from(PLUGIN_KEY),
        InvitationTemplates::new("https://speedtest.example.com/", "http://play.example.com:{port}/"),
    )
}

fn verifier() -> ResultVerifier {
    ResultVerifier::new(
        SigningKey::from(WEB_KEY),
        SigningKey::from(PLUGIN_KEY),
        Arc::new(Directory::new()),
    )
}

/// What the web front-end posts back after a test
fn front_end_result(invitation_token: &str, web_key: &str) -> String {
    let claims = Claims::new()
        .with(claim::TOKEN, invitation_token)
        .with(claim::DOWN, 100)
        .with(claim::UP, 20)
        .with(claim::PING, 15)
        .with(claim::JITTER, 2);
    token::create(&claims, &SigningKey::from(web_key)).expect("web key signs")
}

fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

// =============================================================================
// Round trip
// =============================================================================

/// Invited at 1.2.3.4, result delivered from 1.2.3.4
#[tokio::test]
async fn scenario_matched_address() {
    let invitation = issuer()
        .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
        .unwrap();
    let body = front_end_result(&invitation.token, WEB_KEY);

    let result = verifier().verify(&body, ip("1.2.3.4")).await.unwrap();

    assert!(result.address_matched);
    assert_eq!(result.requester.id, "alice");
    assert_eq!(result.claimed_address, "1.2.3.4");
    assert_eq!(result.observed_address, ip("1.2.3.4"));
    assert_eq!(result.metrics.down, 100.0);
    assert_eq!(result.metrics.up, 20.0);
    assert_eq!(result.metrics.ping, 15.0);
    assert_eq!(result.metrics.jitter, 2.0);
}

/// Same as above but relayed through another address: accepted, flagged
#[tokio::test]
async fn scenario_relayed_address() {
    let invitation = issuer()
        .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
        .unwrap();
    let body = front_end_result(&invitation.token, WEB_KEY);

    let result = verifier().verify(&body, ip("5.6.7.8")).await.unwrap();

    assert!(!result.address_matched);
    assert_eq!(result.claimed_address, "1.2.3.4");
    assert_eq!(result.metrics.down, 100.0);
}

/// The issuer can look the requester up through the host
#[tokio::test]
async fn scenario_invite_through_host() {
    let directory = Directory::new();
    let invitation = issuer().invite(&directory, "bob", 8080).await.unwrap();
    let body = front_end_result(&invitation.token, WEB_KEY);

    let result = verifier().verify(&body, ip("9.9.9.9")).await.unwrap();
    assert_eq!(result.requester.display_name, "Bob");
    assert!(result.address_matched);

    let missing = issuer().invite(&directory, "carol", 8080).await;
    assert!(missing.is_err());
}

// =============================================================================
// ATTACK: forged outer layer
// =============================================================================

/// Outer token signed with anything but the web key
#[tokio::test]
async fn attack_outer_wrong_key() {
    let invitation = issuer()
        .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
        .unwrap();
    let body = front_end_result(&invitation.token, "not-the-web-key");

    let err = verifier().verify(&body, ip("1.2.3.4")).await.unwrap_err();
    assert_eq!(err.reason, RejectReason::OuterSignature(TokenError::SignatureInvalid));
}

/// Inflating the measurements in a genuine result breaks the outer signature
#[tokio::test]
async fn attack_outer_payload_tampering() {
    let invitation = issuer()
        .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
        .unwrap();
    let genuine = front_end_result(&invitation.token, WEB_KEY);

    let inflated = Claims::new()
        .with(claim::TOKEN, invitation.token.as_str())
        .with(claim::DOWN, 10_000)
        .with(claim::UP, 20)
        .with(claim::PING, 15)
        .with(claim::JITTER, 2);
    let forged_payload = token::create(&inflated, &SigningKey::from("anything")).unwrap();

    let genuine_parts: Vec<&str> = genuine.split('.').collect();
    let forged_parts: Vec<&str> = forged_payload.split('.').collect();
    let spliced = format!("{}.{}.{}", genuine_parts[0], forged_parts[1], genuine_parts[2]);

    let err = verifier().verify(&spliced, ip("1.2.3.4")).await.unwrap_err();
    assert_eq!(err.reason, RejectReason::OuterSignature(TokenError::SignatureInvalid));
}

/// Garbage bodies never get past the first layer
#[tokio::test]
async fn attack_malformed_body() {
    for body in ["", "OK", "a.b", "not.a.token", "eyJ.eyJ.!!"] {
        let err = verifier().verify(body, ip("1.2.3.4")).await.unwrap_err();
        assert!(
            matches!(err.reason, RejectReason::OuterSignature(TokenError::Malformed(_))),
            "{body:?} gave {err:?}"
        );
    }
}

// =============================================================================
// ATTACK: forged inner layer
// =============================================================================

/// Someone controlling the web layer fabricates an invitation for alice
#[tokio::test]
async fn attack_fabricated_invitation() {
    let fabricated = token::create(
        &Claims::new()
            .with(claim::NETWORK_ADDRESS, "1.2.3.4")
            .with(claim::REQUESTER_ID, "alice"),
        &SigningKey::from(WEB_KEY),
    )
    .unwrap();
    let body = front_end_result(&fabricated, WEB_KEY);

    let err = verifier().verify(&body, ip("1.2.3.4")).await.unwrap_err();
    assert_eq!(err.reason, RejectReason::InnerSignature(TokenError::SignatureInvalid));
}

/// Rewriting the requester inside alice's invitation to credit bob
#[tokio::test]
async fn attack_requester_swap() {
    let alice = issuer()
        .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
        .unwrap();
    let bob_claims = Claims::new()
        .with(claim::NETWORK_ADDRESS, "1.2.3.4")
        .with(claim::REQUESTER_ID, "bob");
    let bob_payload = token::create(&bob_claims, &SigningKey::from("guess")).unwrap();

    let alice_parts: Vec<&str> = alice.token.split('.').collect();
    let bob_parts: Vec<&str> = bob_payload.split('.').collect();
    let swapped = format!("{}.{}.{}", alice_parts[0], bob_parts[1], alice_parts[2]);
    let body = front_end_result(&swapped, WEB_KEY);

    let err = verifier().verify(&body, ip("1.2.3.4")).await.unwrap_err();
    assert_eq!(err.reason, RejectReason::InnerSignature(TokenError::SignatureInvalid));
}

/// An invitation from a different deployment (other plugin key)
#[tokio::test]
async fn attack_foreign_invitation() {
    let foreign = InvitationIssuer::new(
        SigningKey::from("other-plugin"),
        InvitationTemplates::new("https://speedtest.example.com/", "http://x:{port}/"),
    )
    .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
    .unwrap();
    let body = front_end_result(&foreign.token, WEB_KEY);

    let err = verifier().verify(&body, ip("1.2.3.4")).await.unwrap_err();
    assert_eq!(err.reason, RejectReason::InnerSignature(TokenError::SignatureInvalid));
}

/// Invitations with a TTL cannot be replayed after they lapse
#[tokio::test]
async fn attack_stale_invitation() {
    let stale = issuer()
        .with_ttl(chrono::Duration::hours(-1))
        .issue(&Identity::new("alice", "Alice"), "1.2.3.4", 8080)
        .unwrap();
    let body = front_end_result(&stale.token, WEB_KEY);

    let err = verifier().verify(&body, ip("1.2.3.4")).await.unwrap_err();
    assert!(matches!(err.reason, RejectReason::InnerSignature(TokenError::Expired(_))));
}

/// A valid chain for a requester the host no longer knows
#[tokio::test]
async fn attack_unknown_requester() {
    let invitation = issuer()
        .issue(&Identity::new("ghost", "Ghost"), "1.2.3.4", 8080)
        .unwrap();
    let body = front_end_result(&invitation.token, WEB_KEY);

    let err = verifier().verify(&body, ip("1.2.3.4")).await.unwrap_err();
    assert_eq!(err.reason, RejectReason::UnknownRequester("ghost".into()));
}
