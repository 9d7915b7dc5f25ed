//! Fleetconf Persistence - Database entities and schema bootstrap
//!
//! This crate provides:
//! - SeaORM entity definitions for configurations, history, publishes and statuses
//! - Fleet inventory and resource value entities used by the SQL collaborators
//! - Schema creation from the entity definitions

pub mod entity;
pub mod schema;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

pub use schema::create_tables;
