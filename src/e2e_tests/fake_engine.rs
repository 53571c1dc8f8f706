//! Scripted negotiation engine for tests
//!
//! Produces deterministic NTLM-shaped tokens and records every call so tests
//! can assert on the exact sequence the negotiator issued. Clones share state,
//! which lets a test keep a probe on an engine after moving it into a
//! negotiator.

use crate::auth::engine::{ContextRequirements, NegotiationEngine, StepOutcome};
use crate::auth::handle::{ContextHandle, CredentialHandle, RawHandle};
use crate::auth::identity::AuthIdentity;
use crate::error::SecurityStatus;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

const CREDENTIAL_TAG: usize = 0xC4ED;
const CONTEXT_TAG: usize = 0xC7C7;

/// Recorded `step` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub credential: RawHandle,
    pub had_context: bool,
    pub input: Option<Vec<u8>>,
    pub output_capacity: usize,
    pub target: String,
    pub requirements: ContextRequirements,
}

/// Recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Acquire {
        domain: String,
        user: String,
        package: String,
    },
    QueryMaxTokenSize(String),
    Step(StepRecord),
    Complete(RawHandle),
    ReleaseCredential(RawHandle),
    ReleaseContext(RawHandle),
}

/// One scripted `step` response
#[derive(Debug, Clone, Copy)]
pub struct Script {
    status: SecurityStatus,
    written: usize,
    overreport: bool,
    context: Option<RawHandle>,
}

impl Script {
    /// Write `written` bytes and report `status`
    pub fn emit(status: SecurityStatus, written: usize) -> Self {
        Self {
            status,
            written,
            overreport: false,
            context: None,
        }
    }

    /// Report `written` bytes without bounding it by the buffer size
    pub fn overreport(status: SecurityStatus, written: usize) -> Self {
        Self {
            status,
            written,
            overreport: true,
            context: None,
        }
    }

    /// Overwrite the context handle with `context` and report a failure
    pub fn fail_with_context(status: SecurityStatus, context: RawHandle) -> Self {
        Self {
            status,
            written: 0,
            overreport: false,
            context: Some(context),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    max_token_size: u32,
    reject_anonymous: bool,
    query_failure: Option<SecurityStatus>,
    completion_failure: Option<SecurityStatus>,
    release_failure: Option<SecurityStatus>,
    script: VecDeque<Script>,
    next_handle: usize,
    identities: HashMap<usize, String>,
    calls: Vec<EngineCall>,
}

#[derive(Debug, Clone)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    /// Byte written over the output token by `complete_token`
    pub const COMPLETION_MARK: u8 = 0xC3;

    /// Default NTLM `cbMaxToken`
    pub const DEFAULT_MAX_TOKEN_SIZE: u32 = 2888;

    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                max_token_size: Self::DEFAULT_MAX_TOKEN_SIZE,
                next_handle: 1,
                ..FakeState::default()
            })),
        }
    }

    pub fn with_max_token_size(self, size: u32) -> Self {
        self.lock().max_token_size = size;
        self
    }

    pub fn with_script(self, script: Vec<Script>) -> Self {
        self.lock().script = script.into();
        self
    }

    pub fn rejecting_anonymous(self) -> Self {
        self.lock().reject_anonymous = true;
        self
    }

    pub fn failing_query(self, status: SecurityStatus) -> Self {
        self.lock().query_failure = Some(status);
        self
    }

    pub fn failing_completion(self, status: SecurityStatus) -> Self {
        self.lock().completion_failure = Some(status);
        self
    }

    pub fn failing_release(self, status: SecurityStatus) -> Self {
        self.lock().release_failure = Some(status);
        self
    }

    /// Handle sharing this engine's recorded state
    pub fn probe(&self) -> Self {
        self.clone()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn steps(&self) -> Vec<StepRecord> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Step(step) => Some(step.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn step_count(&self) -> usize {
        self.steps().len()
    }

    pub fn acquire_count(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Acquire { .. }))
    }

    pub fn completions(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Complete(_)))
    }

    pub fn released_credentials(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::ReleaseCredential(_)))
    }

    pub fn released_contexts(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::ReleaseContext(_)))
    }

    fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Deterministic token body: signature, round marker, the bound identity and
/// the context handle, then a checksum of the input.
fn token_bytes(identity: &str, round: u8, context: RawHandle, input: Option<&[u8]>) -> Vec<u8> {
    let mut bytes = b"NTLMSSP\0".to_vec();
    bytes.push(round);
    bytes.extend_from_slice(identity.as_bytes());
    bytes.extend_from_slice(&(context.lower as u32).to_le_bytes());
    let checksum = input
        .unwrap_or_default()
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    bytes.push(checksum);
    bytes
}

impl NegotiationEngine for FakeEngine {
    fn acquire_credential(
        &mut self,
        identity: &AuthIdentity,
        package: &str,
    ) -> Result<CredentialHandle, SecurityStatus> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Acquire {
            domain: identity.domain().to_string(),
            user: identity.user().to_string(),
            package: package.to_string(),
        });

        if state.reject_anonymous && identity.is_anonymous() {
            return Err(SecurityStatus::NO_CREDENTIALS);
        }
        if package != "NTLM" {
            return Err(SecurityStatus::SECPKG_NOT_FOUND);
        }

        let id = state.next_handle;
        state.next_handle += 1;
        state
            .identities
            .insert(id, format!("{}\\{}", identity.domain(), identity.user()));
        Ok(CredentialHandle::from_raw(RawHandle::new(id, CREDENTIAL_TAG)))
    }

    fn query_max_token_size(&mut self, package: &str) -> Result<u32, SecurityStatus> {
        let mut state = self.lock();
        state
            .calls
            .push(EngineCall::QueryMaxTokenSize(package.to_string()));
        match state.query_failure {
            Some(status) => Err(status),
            None => Ok(state.max_token_size),
        }
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
        let mut state = self.lock();
        state.calls.push(EngineCall::Step(StepRecord {
            credential: credential.raw(),
            had_context: context.is_some(),
            input: input.map(<[u8]>::to_vec),
            output_capacity: output.len(),
            target: target.to_string(),
            requirements,
        }));

        let identity = match state.identities.get(&credential.raw().lower) {
            Some(identity) => identity.clone(),
            None => return StepOutcome::failed(SecurityStatus::INVALID_HANDLE),
        };

        if context.is_none() {
            let id = state.next_handle;
            state.next_handle += 1;
            *context = Some(ContextHandle::from_raw(RawHandle::new(id, CONTEXT_TAG)));
        }

        let script = state.script.pop_front().unwrap_or_else(|| match input {
            None => Script::emit(SecurityStatus::CONTINUE_NEEDED, usize::MAX),
            Some(_) => Script::emit(SecurityStatus::OK, usize::MAX),
        });

        if let Some(raw) = script.context {
            if let Some(handle) = context.as_mut() {
                handle.set_raw(raw);
            }
        }

        if script.status.is_failure() {
            return StepOutcome::failed(script.status);
        }

        let round = if input.is_some() { 3 } else { 1 };
        let context_raw = context.as_ref().map(ContextHandle::raw).unwrap_or_default();
        let mut body = token_bytes(&identity, round, context_raw, input);
        // pad scripted lengths with a repeating pattern
        let wanted = if script.written == usize::MAX {
            body.len()
        } else {
            script.written
        };
        while body.len() < wanted.min(output.len()) {
            body.push(body.len() as u8);
        }

        let written = wanted.min(output.len()).min(body.len());
        output[..written].copy_from_slice(&body[..written]);

        let reported = if script.overreport {
            script.written
        } else {
            written
        };
        StepOutcome::new(script.status, reported)
    }

    fn complete_token(
        &mut self,
        context: &ContextHandle,
        output: &mut [u8],
    ) -> Result<(), SecurityStatus> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Complete(context.raw()));
        if let Some(status) = state.completion_failure {
            return Err(status);
        }
        output.fill(Self::COMPLETION_MARK);
        Ok(())
    }

    fn release_credential(&mut self, credential: CredentialHandle) -> Result<(), SecurityStatus> {
        let raw = credential.into_raw();
        let mut state = self.lock();
        state.calls.push(EngineCall::ReleaseCredential(raw));
        state.identities.remove(&raw.lower);
        match state.release_failure {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn release_context(&mut self, context: ContextHandle) -> Result<(), SecurityStatus> {
        let mut state = self.lock();
        state
            .calls
            .push(EngineCall::ReleaseContext(context.into_raw()));
        match state.release_failure {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}
