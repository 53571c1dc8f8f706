//! Negotiator configuration

use crate::auth::engine::ContextRequirements;

/// Security package used when none is configured
pub const DEFAULT_PACKAGE: &str = "NTLM";

/// Target service name agreed with the serving side
pub const DEFAULT_TARGET_NAME: &str = "InetSvcs";

/// NTLM negotiator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatorConfig {
    /// Security package name passed to the engine
    pub package: String,
    /// Target service name passed on every step
    pub target_name: String,
    /// Context requirements passed on every step
    pub requirements: ContextRequirements,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            package: String::from(DEFAULT_PACKAGE),
            target_name: String::from(DEFAULT_TARGET_NAME),
            requirements: ContextRequirements::empty(),
        }
    }
}

impl NegotiatorConfig {
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = target_name.into();
        self
    }

    pub fn with_requirements(mut self, requirements: ContextRequirements) -> Self {
        self.requirements = requirements;
        self
    }
}
