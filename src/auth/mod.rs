//! NTLM authentication negotiation
//!
//! The negotiator drives the client side of the NTLM handshake. The NTLM
//! messages themselves are built by a [`NegotiationEngine`]; on Windows the
//! `sspi` feature provides one backed by the system security provider.

pub mod basic;
pub mod engine;
pub mod handle;
pub mod identity;
pub mod negotiator;
pub mod token;

#[cfg(all(windows, feature = "sspi"))]
#[allow(unsafe_code)]
pub mod sspi;

pub use engine::{ContextRequirements, NegotiationEngine, StepOutcome};
pub use handle::{ContextHandle, CredentialHandle, RawHandle};
pub use identity::AuthIdentity;
pub use negotiator::{NegotiationState, NtlmNegotiator};
