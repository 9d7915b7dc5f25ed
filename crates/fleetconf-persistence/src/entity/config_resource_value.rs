//! Resource value entity
//!
//! The id is the value's global version, referenced from configuration
//! content placeholders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "config_resource_value")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub config_resource_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
