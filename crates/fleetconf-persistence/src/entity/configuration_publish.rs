//! Configuration publish entity
//!
//! One immutable record per publish action.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration_publish")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub configuration_id: i32,
    pub configuration_history_id: i32,
    /// JSON array of the target host names
    #[sea_orm(column_type = "Text")]
    pub apply_instance: String,
    /// Planned storage paths joined with `;`, canonical path first
    #[sea_orm(column_type = "Text")]
    pub file_path: String,
    pub uid: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
