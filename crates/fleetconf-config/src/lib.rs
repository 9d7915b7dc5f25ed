//! Fleetconf Config - Configuration version & publish/reconciliation engine
//!
//! This crate provides:
//! - Version ledger: content fingerprints and immutable history
//! - Path planning per deployment root directory
//! - Publish orchestration to the distributed key-value store
//! - Per-instance status reconciliation
//! - Remote content fetching from host agents

pub mod collaborator;
pub mod context;
pub mod model;
pub mod service;

// Re-export commonly used types
pub use context::{EngineContext, EngineContextBuilder, EngineSettings, StatusProbes};
pub use model::*;
