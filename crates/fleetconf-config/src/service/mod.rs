//! Engine service layer
//!
//! - `ledger`: fingerprints and version saves
//! - `path`: storage path planning
//! - `publish`: two-phase publish (key-value store, then ledger)
//! - `status`: per-instance status reconciliation
//! - `fetch`: remote content reads
//! - `config`, `history`: configuration CRUD, history paging and diff

pub mod config;
pub mod fetch;
pub mod history;
pub mod ledger;
pub mod path;
pub mod publish;
pub mod status;

pub use ledger::compute_fingerprint;
pub use path::resolve_paths;
pub use publish::{PublishPlan, StoreCommitted};
