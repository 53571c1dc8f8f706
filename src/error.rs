//! Error types for the NTLM negotiator

use std::fmt;
use thiserror::Error;

/// Result type for negotiator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for NTLM negotiation
#[derive(Debug, Error)]
pub enum Error {
    /// The engine rejected the identity or the security package
    #[error("Credential acquisition failed: {0}")]
    CredentialAcquisitionError(SecurityStatus),

    /// The maximum token size could not be queried for the package
    #[error("Security package query failed: {0}")]
    PackageQueryError(SecurityStatus),

    /// The input token was not valid base64
    #[error("Token decode error: {0}")]
    TokenDecodeError(#[from] base64::DecodeError),

    /// The engine reported a failure while stepping or completing the context
    #[error("Security context error: {0}")]
    SecurityContextError(SecurityStatus),

    /// A credential is already held; `reset` must be called first
    #[error("Negotiator already holds a credential")]
    AlreadyInitialised,

    /// No credential is held; `initialise` must be called first
    #[error("Negotiator holds no credential")]
    NotInitialised,

    /// The stored Basic-auth fallback string could not be decoded
    #[error("Invalid Basic credential: {0}")]
    BasicCredentialError(String),
}

/// Security status code reported by a negotiation engine (SSPI `SECURITY_STATUS`).
///
/// Unknown codes are kept verbatim so failures can be reported exactly as the
/// engine raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecurityStatus(u32);

impl SecurityStatus {
    /// The call completed successfully
    pub const OK: Self = Self(0x0000_0000);
    /// The token must be sent to the server and a response awaited
    pub const CONTINUE_NEEDED: Self = Self(0x0009_0312);
    /// The token must be completed before it is sent
    pub const COMPLETE_NEEDED: Self = Self(0x0009_0313);
    /// The token must be completed, sent, and a response awaited
    pub const COMPLETE_AND_CONTINUE: Self = Self(0x0009_0314);
    /// Not enough memory
    pub const INSUFFICIENT_MEMORY: Self = Self(0x8009_0300);
    /// The handle is not valid
    pub const INVALID_HANDLE: Self = Self(0x8009_0301);
    /// The function is not supported
    pub const UNSUPPORTED_FUNCTION: Self = Self(0x8009_0302);
    /// The target is unknown or unreachable
    pub const TARGET_UNKNOWN: Self = Self(0x8009_0303);
    /// Internal engine error
    pub const INTERNAL_ERROR: Self = Self(0x8009_0304);
    /// The requested security package does not exist
    pub const SECPKG_NOT_FOUND: Self = Self(0x8009_0305);
    /// The token supplied is invalid
    pub const INVALID_TOKEN: Self = Self(0x8009_0308);
    /// The logon attempt failed
    pub const LOGON_DENIED: Self = Self(0x8009_030C);
    /// The credentials supplied to the package were not recognized
    pub const UNKNOWN_CREDENTIALS: Self = Self(0x8009_030D);
    /// No credentials are available in the security package
    pub const NO_CREDENTIALS: Self = Self(0x8009_030E);
    /// The supplied buffer is too small
    pub const BUFFER_TOO_SMALL: Self = Self(0x8009_0321);
    /// The target principal name is incorrect
    pub const WRONG_PRINCIPAL: Self = Self(0x8009_0322);

    /// Create from a raw status value
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Create from the signed `HRESULT`-style representation
    pub const fn from_i32(value: i32) -> Self {
        Self(value as u32)
    }

    /// Raw status value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this is a success-class status (severity bit clear)
    pub fn is_success(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    /// Check if this is a failure-class status
    pub fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Check if the output token must be passed to `CompleteAuthToken`
    pub fn needs_completion(self) -> bool {
        self == Self::COMPLETE_NEEDED || self == Self::COMPLETE_AND_CONTINUE
    }

    /// Check if the handshake expects another server token
    pub fn needs_continue(self) -> bool {
        self == Self::CONTINUE_NEEDED || self == Self::COMPLETE_AND_CONTINUE
    }

    fn name(self) -> &'static str {
        match self {
            Self::OK => "OK",
            Self::CONTINUE_NEEDED => "Continue needed",
            Self::COMPLETE_NEEDED => "Complete needed",
            Self::COMPLETE_AND_CONTINUE => "Complete and continue",
            Self::INSUFFICIENT_MEMORY => "Insufficient memory",
            Self::INVALID_HANDLE => "Invalid handle",
            Self::UNSUPPORTED_FUNCTION => "Unsupported function",
            Self::TARGET_UNKNOWN => "Target unknown",
            Self::INTERNAL_ERROR => "Internal error",
            Self::SECPKG_NOT_FOUND => "Security package not found",
            Self::INVALID_TOKEN => "Invalid token",
            Self::LOGON_DENIED => "Logon denied",
            Self::UNKNOWN_CREDENTIALS => "Unknown credentials",
            Self::NO_CREDENTIALS => "No credentials",
            Self::BUFFER_TOO_SMALL => "Buffer too small",
            Self::WRONG_PRINCIPAL => "Wrong principal",
            _ if self.is_success() => "Unknown success status",
            _ => "Unknown failure status",
        }
    }
}

impl From<u32> for SecurityStatus {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}
