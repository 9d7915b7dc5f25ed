//! Configuration history entity
//!
//! Immutable, one row per distinct content version. Exactly one of `uid`
//! and `access_token_id` identifies the author.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub configuration_id: i32,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub version: String,
    pub uid: Option<i32>,
    pub access_token_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub change_log: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
