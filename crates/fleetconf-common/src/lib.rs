//! Fleetconf Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Fleetconf components:
//! - Error types and error codes
//! - Agent payload encryption

pub mod crypto;
pub mod error;

// Re-exports for convenience
pub use crypto::{AgentCipher, CryptoError, CryptoResult};
pub use error::{ErrorCode, FleetconfError, Result};

/// Configuration format that carries an injected version header line
pub const VERSION_HEADER_FORMAT: &str = "toml";

/// Key of the version header line injected into published toml content
pub const VERSION_HEADER_KEY: &str = "fleetconf_configuration_version";
