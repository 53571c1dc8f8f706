//! Capability contract of the negotiation engine
//!
//! The engine builds and validates the NTLM messages themselves. The
//! negotiator only sequences calls into it, so everything it needs is the
//! handful of primitives below.

use crate::auth::handle::{ContextHandle, CredentialHandle, RawHandle};
use crate::auth::identity::AuthIdentity;
use crate::error::SecurityStatus;
use bitflags::bitflags;

bitflags! {
    /// Context requirements requested when stepping the security context
    /// (the SSPI `ISC_REQ_*` flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContextRequirements: u32 {
        /// Server may impersonate the client
        const DELEGATE = 0x0000_0001;
        /// Mutual authentication
        const MUTUAL_AUTH = 0x0000_0002;
        /// Detect replayed messages
        const REPLAY_DETECT = 0x0000_0004;
        /// Detect out-of-sequence messages
        const SEQUENCE_DETECT = 0x0000_0008;
        /// Messages may be encrypted
        const CONFIDENTIALITY = 0x0000_0010;
        /// Use session key only
        const USE_SESSION_KEY = 0x0000_0020;
        /// Prompt for credentials if needed
        const PROMPT_FOR_CREDS = 0x0000_0040;
        /// Use supplied credentials only
        const USE_SUPPLIED_CREDS = 0x0000_0080;
        /// Engine allocates output buffers
        const ALLOCATE_MEMORY = 0x0000_0100;
        /// Connection-oriented semantics
        const CONNECTION = 0x0000_0800;
        /// Stream-oriented semantics
        const STREAM = 0x0000_8000;
        /// Messages may be signed
        const INTEGRITY = 0x0001_0000;
        /// Identify level only
        const IDENTIFY = 0x0002_0000;
    }
}

/// Result of a single `step` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: SecurityStatus,
    /// Number of bytes the engine wrote into the output buffer
    pub written: usize,
}

impl StepOutcome {
    pub fn new(status: SecurityStatus, written: usize) -> Self {
        Self { status, written }
    }

    pub fn failed(status: SecurityStatus) -> Self {
        Self { status, written: 0 }
    }
}

/// Negotiation engine primitives
pub trait NegotiationEngine {
    /// Acquire an outbound credential for `package` bound to `identity`
    fn acquire_credential(
        &mut self,
        identity: &AuthIdentity,
        package: &str,
    ) -> Result<CredentialHandle, SecurityStatus>;

    /// Maximum token size the package can produce
    fn query_max_token_size(&mut self, package: &str) -> Result<u32, SecurityStatus>;

    /// Advance the security context by one round.
    ///
    /// `context` is `None` on the first round; the engine stores the context
    /// it creates (or updates) there, including on failure. `input` is `None`
    /// on the first round. The engine writes at most `output.len()` bytes.
    fn step(
        &mut self,
        credential: &CredentialHandle,
        context: &mut Option<ContextHandle>,
        input: Option<&[u8]>,
        output: &mut [u8],
        target: &str,
        requirements: ContextRequirements,
    ) -> StepOutcome;

    /// Finish an output token after a needs-completion status
    fn complete_token(
        &mut self,
        context: &ContextHandle,
        output: &mut [u8],
    ) -> Result<(), SecurityStatus>;

    /// Release a credential
    fn release_credential(&mut self, credential: CredentialHandle) -> Result<(), SecurityStatus>;

    /// Release a security context. Engines that reclaim contexts implicitly
    /// may keep the default.
    fn release_context(&mut self, context: ContextHandle) -> Result<(), SecurityStatus> {
        let _released: RawHandle = context.into_raw();
        Ok(())
    }
}

impl<E: NegotiationEngine + ?Sized> NegotiationEngine for Box<E> {
    fn acquire_credential(
        &mut self,
        identity: &AuthIdentity,
        package: &str,
    ) -> Result<CredentialHandle, SecurityStatus> {
        (**self).acquire_credential(identity, package)
    }

    fn query_max_token_size(&mut self, package: &str) -> Result<u32, SecurityStatus> {
        (**self).query_max_token_size(package)
    }

    fn step(
        &mut self,
        credential: &CredentialHandle,
        context: &mut Option<ContextHandle>,
        input: Option<&[u8]>,
        output: &mut [u8],
        target: &str,
        requirements: ContextRequirements,
    ) -> StepOutcome {
        (**self).step(credential, context, input, output, target, requirements)
    }

    fn complete_token(
        &mut self,
        context: &ContextHandle,
        output: &mut [u8],
    ) -> Result<(), SecurityStatus> {
        (**self).complete_token(context, output)
    }

    fn release_credential(&mut self, credential: CredentialHandle) -> Result<(), SecurityStatus> {
        (**self).release_credential(credential)
    }

    fn release_context(&mut self, context: ContextHandle) -> Result<(), SecurityStatus> {
        (**self).release_context(context)
    }
}
