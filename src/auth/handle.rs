//! Owned wrappers for engine credential and security-context handles
//!
//! Engines hand out opaque two-word handles (the SSPI `SecHandle` layout).
//! The wrappers here are neither `Clone` nor `Copy`: releasing a handle
//! consumes it, so a handle cannot be released twice.

/// Opaque two-word handle value as produced by a negotiation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawHandle {
    pub lower: usize,
    pub upper: usize,
}

impl RawHandle {
    /// The "no handle held" sentinel
    pub const NULL: Self = Self { lower: 0, upper: 0 };

    pub const fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

/// Handle to an acquired outbound credential
#[derive(Debug, PartialEq, Eq)]
#[must_use = "credential handles must be released through the engine"]
pub struct CredentialHandle(RawHandle);

impl CredentialHandle {
    pub fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> RawHandle {
        self.0
    }

    /// Consume the wrapper, returning the raw value for the release call
    pub fn into_raw(self) -> RawHandle {
        self.0
    }
}

/// Handle to an in-progress or completed security context
#[derive(Debug, PartialEq, Eq)]
#[must_use = "security context handles must be released through the engine"]
pub struct ContextHandle(RawHandle);

impl ContextHandle {
    pub fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> RawHandle {
        self.0
    }

    /// Overwrite the raw value in place; engines update contexts this way
    pub fn set_raw(&mut self, raw: RawHandle) {
        self.0 = raw;
    }

    pub fn into_raw(self) -> RawHandle {
        self.0
    }
}
