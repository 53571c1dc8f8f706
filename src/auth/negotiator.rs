//! NTLM negotiation state machine
//!
//! Sequences `initialise → continue_token* → reset` against a
//! [`NegotiationEngine`], converting between base64 wire tokens and the raw
//! buffers the engine works on. One negotiator serves one authentication
//! realm; callers that share negotiators between threads serialise access per
//! realm (see [`crate::realm::NegotiatorRegistry`]).

use crate::auth::basic::decode_basic;
use crate::auth::engine::NegotiationEngine;
use crate::auth::handle::{ContextHandle, CredentialHandle, RawHandle};
use crate::auth::identity::AuthIdentity;
use crate::auth::token::TokenBuffer;
use crate::config::NegotiatorConfig;
use crate::error::{Error, Result, SecurityStatus};
use crate::realm::AuthScope;
use tracing::{debug, trace, warn};

/// Negotiation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// No credential held
    Empty,
    /// Credential acquired, no context yet
    CredentialReady,
    /// Context created, engine expects another server token
    ContextInProgress,
    /// Engine reported the final token
    Completed,
    /// Engine reported a failure status
    Failed,
}

/// Client-side NTLM negotiator bound to one engine
pub struct NtlmNegotiator<E: NegotiationEngine> {
    engine: E,
    config: NegotiatorConfig,
    credential: Option<CredentialHandle>,
    context: Option<ContextHandle>,
    /// `None` until the package query for the held credential succeeds
    max_token_size: Option<u32>,
    state: NegotiationState,
    site: Option<String>,
    path: Option<String>,
    scope: AuthScope,
    basic: Option<String>,
}

impl<E: NegotiationEngine> NtlmNegotiator<E> {
    /// Create an empty negotiator with the default configuration
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, NegotiatorConfig::default())
    }

    /// Create an empty negotiator with a custom configuration
    pub fn with_config(engine: E, config: NegotiatorConfig) -> Self {
        Self {
            engine,
            config,
            credential: None,
            context: None,
            max_token_size: None,
            state: NegotiationState::Empty,
            site: None,
            path: None,
            scope: AuthScope::default(),
            basic: None,
        }
    }

    /// Acquire an outbound credential for the given identity and cache the
    /// package's maximum token size.
    ///
    /// A failed size query leaves the credential held; call [`reset`](Self::reset)
    /// before retrying.
    pub fn initialise(&mut self, domain: &str, user: &str, password: &str) -> Result<()> {
        self.initialise_identity(&AuthIdentity::new(domain, user, password))
    }

    /// Same as [`initialise`](Self::initialise) for an already built identity
    pub fn initialise_identity(&mut self, identity: &AuthIdentity) -> Result<()> {
        if self.credential.is_some() {
            return Err(Error::AlreadyInitialised);
        }

        debug!(
            package = %self.config.package,
            domain = identity.domain(),
            user = identity.user(),
            "Acquiring credential"
        );

        let credential = self
            .engine
            .acquire_credential(identity, &self.config.package)
            .map_err(|status| {
                warn!(%status, "Credential acquisition failed");
                Error::CredentialAcquisitionError(status)
            })?;
        self.credential = Some(credential);

        let max_token_size = self
            .engine
            .query_max_token_size(&self.config.package)
            .map_err(|status| {
                warn!(%status, "Security package query failed");
                Error::PackageQueryError(status)
            })?;
        self.max_token_size = Some(max_token_size);
        self.state = NegotiationState::CredentialReady;

        debug!(max_token_size, "Credential ready");
        Ok(())
    }

    /// Decode the stored Basic fallback credential and initialise with it.
    ///
    /// `default_domain` is used when the user name carries no `DOMAIN\` prefix.
    pub fn initialise_from_basic(&mut self, default_domain: &str) -> Result<()> {
        let identity = match self.basic.as_deref() {
            Some(basic) => decode_basic(basic, default_domain)?,
            None => {
                return Err(Error::BasicCredentialError(
                    "no Basic credential stored".into(),
                ))
            }
        };
        self.initialise_identity(&identity)
    }

    /// Advance the handshake by one round.
    ///
    /// Pass `None` for the first round to obtain the negotiate token, then each
    /// server challenge token in turn. Returns the base64 token to send, or
    /// `None` if the engine produced no output. A failure leaves the handles
    /// exactly as the engine left them.
    pub fn continue_token(&mut self, token: Option<&str>) -> Result<Option<String>> {
        let (credential, max_token_size) = match (self.credential.as_ref(), self.max_token_size) {
            (Some(credential), Some(max_token_size)) => (credential, max_token_size),
            _ => return Err(Error::NotInitialised),
        };

        let input = token.map(TokenBuffer::decode).transpose()?;
        let mut output = TokenBuffer::with_size(max_token_size as usize);

        if input.is_none() {
            if let Some(stale) = self.context.take() {
                debug!("Releasing stale security context before a new handshake");
                if let Err(status) = self.engine.release_context(stale) {
                    warn!(%status, "Failed to release stale security context");
                }
            }
        }

        trace!(
            input_len = input.as_ref().map_or(0, |b| b.len()),
            output_len = output.len(),
            "Stepping security context"
        );

        let outcome = self.engine.step(
            credential,
            &mut self.context,
            input.as_deref(),
            &mut output,
            &self.config.target_name,
            self.config.requirements,
        );
        let status = outcome.status;

        if status.is_failure() {
            warn!(%status, "Security context step failed");
            self.state = NegotiationState::Failed;
            return Err(Error::SecurityContextError(status));
        }

        if outcome.written > output.len() {
            warn!(
                written = outcome.written,
                capacity = output.len(),
                "Engine reported more output than the token buffer holds"
            );
            self.state = NegotiationState::Failed;
            return Err(Error::SecurityContextError(SecurityStatus::BUFFER_TOO_SMALL));
        }

        if status.needs_completion() {
            let context = match self.context.as_ref() {
                Some(context) => context,
                None => {
                    self.state = NegotiationState::Failed;
                    return Err(Error::SecurityContextError(SecurityStatus::INVALID_HANDLE));
                }
            };
            trace!(%status, "Completing output token");
            if let Err(status) = self
                .engine
                .complete_token(context, &mut output[..outcome.written])
            {
                warn!(%status, "Token completion failed");
                self.state = NegotiationState::Failed;
                return Err(Error::SecurityContextError(status));
            }
        }

        self.state = if status.needs_continue() {
            NegotiationState::ContextInProgress
        } else {
            NegotiationState::Completed
        };

        debug!(%status, written = outcome.written, state = ?self.state, "Security context stepped");
        Ok(output.encode_prefix(outcome.written))
    }

    /// Release both handles and return to the empty state.
    ///
    /// Never fails: release errors are logged and dropped so the negotiator is
    /// always reusable afterwards.
    pub fn reset(&mut self) {
        self.basic = None;

        if let Some(context) = self.context.take() {
            if let Err(status) = self.engine.release_context(context) {
                warn!(%status, "Failed to release security context");
            }
        }

        if let Some(credential) = self.credential.take() {
            if let Err(status) = self.engine.release_credential(credential) {
                warn!(%status, "Failed to release credential");
            }
        }

        self.max_token_size = None;
        self.state = NegotiationState::Empty;
        trace!("Negotiator reset");
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Cached maximum token size, 0 while no credential is ready
    pub fn max_token_size(&self) -> u32 {
        self.max_token_size.unwrap_or(0)
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Raw value of the current security context, if any
    pub fn context_handle(&self) -> Option<RawHandle> {
        self.context.as_ref().map(ContextHandle::raw)
    }

    /// Raw value of the current credential, if any
    pub fn credential_handle(&self) -> Option<RawHandle> {
        self.credential.as_ref().map(CredentialHandle::raw)
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn set_site(&mut self, site: Option<String>) {
        self.site = site;
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<String>) {
        self.path = path;
    }

    pub fn scope(&self) -> AuthScope {
        self.scope
    }

    pub fn set_scope(&mut self, scope: AuthScope) {
        self.scope = scope;
    }

    /// Stored Basic-auth fallback string, returned verbatim
    pub fn basic(&self) -> Option<&str> {
        self.basic.as_deref()
    }

    pub fn set_basic(&mut self, basic: Option<String>) {
        self.basic = basic;
    }
}

impl<E: NegotiationEngine> Drop for NtlmNegotiator<E> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<E: NegotiationEngine> std::fmt::Debug for NtlmNegotiator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtlmNegotiator")
            .field("state", &self.state)
            .field("credential", &self.credential)
            .field("context", &self.context)
            .field("max_token_size", &self.max_token_size)
            .field("site", &self.site)
            .field("path", &self.path)
            .field("scope", &self.scope)
            .field("basic", &self.basic.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
