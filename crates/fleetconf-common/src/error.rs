//! Error types and error codes for Fleetconf
//!
//! This module defines:
//! - `FleetconfError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for API and CLI responses

use serde::{Deserialize, Serialize};

use crate::crypto::CryptoError;

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum FleetconfError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no instances for app {aid} in env '{env}' zone '{zone_code}'")]
    NoInstances {
        aid: i32,
        env: String,
        zone_code: String,
    },

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("decryption failure: {0}")]
    DecryptionFailure(String),
}

/// Result alias used by the engine services
pub type Result<T> = std::result::Result<T, FleetconfError>;

impl FleetconfError {
    pub fn not_found(what: impl Into<String>) -> Self {
        FleetconfError::NotFound(what.into())
    }

    pub fn upstream(err: impl std::fmt::Display) -> Self {
        FleetconfError::UpstreamFailure(err.to_string())
    }

    /// Stable error code for this error
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            FleetconfError::IllegalArgument(_) => PARAMETER_VALIDATE_ERROR,
            FleetconfError::NotFound(_) => RESOURCE_NOT_FOUND,
            FleetconfError::Conflict(_) => RESOURCE_CONFLICT,
            FleetconfError::NoInstances { .. } => CONFIG_NO_INSTANCES,
            FleetconfError::UpstreamFailure(_) => DATA_ACCESS_ERROR,
            FleetconfError::DecryptionFailure(_) => CONFIG_DECRYPT_FAILED,
        }
    }
}

impl From<sea_orm::DbErr> for FleetconfError {
    fn from(value: sea_orm::DbErr) -> Self {
        FleetconfError::UpstreamFailure(format!("database error: {}", value))
    }
}

impl From<serde_json::Error> for FleetconfError {
    fn from(value: serde_json::Error) -> Self {
        FleetconfError::UpstreamFailure(format!("malformed payload: {}", value))
    }
}

impl From<CryptoError> for FleetconfError {
    fn from(value: CryptoError) -> Self {
        FleetconfError::DecryptionFailure(value.to_string())
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const CONFIG_NO_INSTANCES: ErrorCode<'static> = ErrorCode {
    code: 20020,
    message: "no instances to publish to",
};

pub const CONFIG_DECRYPT_FAILED: ErrorCode<'static> = ErrorCode {
    code: 20021,
    message: "config file decrypt failed",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
