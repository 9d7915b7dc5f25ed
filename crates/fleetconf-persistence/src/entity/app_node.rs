//! Node entity of the fleet inventory
//!
//! One running deployment unit of an application in an env and zone.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "app_node")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub aid: i32,
    pub app_name: String,
    pub host_name: String,
    pub ip: String,
    pub device_id: i32,
    pub env: String,
    pub region_code: String,
    pub region_name: String,
    pub zone_code: String,
    pub zone_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
