//! # Speed-test core
//!
//! Token issuance and verification for the speed-test round trip:
//!
//! 1. The service issues an **invitation**: a URL to the speed-test front-end
//!    carrying a token signed with the *plugin key* (requester id + address).
//! 2. The front-end runs the test and posts back an **outer token** signed with
//!    the *web key*, carrying the four measurements and the invitation token.
//! 3. The service verifies **both layers** before recording anything.
//!
//! The host process is reached only through [`IdentityProvider`] and
//! [`ScoreSink`].

pub mod effects;
pub mod error;
pub mod host;
pub mod invitation;
pub mod token;
pub mod types;
pub mod verify;

pub use effects::{Effect, EffectSwitch, RecordedScores};
pub use error::{HostError, InvitationError, RejectReason, ResultRejected, TokenError};
pub use host::{Identity, IdentityProvider, ScoreSink};
pub use invitation::{Invitation, InvitationIssuer, InvitationTemplates};
pub use token::{Claims, SigningKey};
pub use types::{MeasurementResult, Metrics, ProvenanceStatus};
pub use verify::ResultVerifier;
