//! Client-side NTLM negotiation for HTTP proxy and server authentication
//!
//! A sans-io state machine that produces and consumes the base64 tokens
//! carried in `Authorization` / `Proxy-Authorization` headers. Transport and
//! header handling stay with the caller.

#![allow(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod realm;

#[cfg(test)]
pub mod e2e_tests;

pub use auth::{AuthIdentity, NegotiationEngine, NegotiationState, NtlmNegotiator};
pub use config::NegotiatorConfig;
pub use error::{Error, Result, SecurityStatus};
pub use realm::{AuthScope, NegotiatorRegistry, Realm};
