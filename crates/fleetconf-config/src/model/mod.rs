//! Engine data models
//!
//! This module contains the views and payloads produced by the engine:
//! - Configuration list/detail views and forms
//! - History pages and diffs
//! - Publish envelopes and receipts
//! - Per-instance status and remote content views

pub mod config;
pub mod publish;
pub mod status;

pub use config::*;
pub use publish::*;
pub use status::*;
