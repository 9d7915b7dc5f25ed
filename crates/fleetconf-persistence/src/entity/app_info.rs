//! Application entity of the fleet inventory

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "app_info")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub aid: i32,
    pub app_name: String,
    /// Port of the application's governance endpoint
    pub govern_port: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
