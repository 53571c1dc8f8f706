//! End-to-end handshake tests against a scripted engine

pub mod fake_engine;

// Test scenario modules
pub mod properties;

pub use fake_engine::FakeEngine;
