//! Operation log entity for audit logging
//!
//! Tracks publish operations performed on configurations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "operation_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Operation type: PUBLISH, ...
    pub operation: String,
    /// Resource type: CONFIG
    pub resource_type: String,
    /// Resource identifier (e.g., app@@env@@zone for config)
    #[sea_orm(column_type = "Text", nullable)]
    pub resource_id: Option<String>,
    /// Application id the operation applies to
    pub aid: i32,
    /// User who performed the operation
    pub operator: String,
    /// Operation result: SUCCESS, FAILURE
    pub result: String,
    /// Additional details in JSON format
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,
    /// When the operation occurred
    pub gmt_create: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
