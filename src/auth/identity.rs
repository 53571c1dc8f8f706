//! Identity descriptor passed to the engine when acquiring a credential

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain, user and password triple. Empty fields are allowed and describe an
/// anonymous-style identity; whether that is accepted is up to the engine.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthIdentity {
    domain: String,
    user: String,
    password: String,
}

impl AuthIdentity {
    pub fn new(
        domain: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// True when all three fields are empty
    pub fn is_anonymous(&self) -> bool {
        self.domain.is_empty() && self.user.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthIdentity")
            .field("domain", &self.domain)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
