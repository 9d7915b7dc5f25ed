//! Configuration entity
//!
//! One logical config file of an application in an environment and zone.
//! (aid, env, name, format) is unique.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub aid: i32,
    /// File name without the format suffix
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub format: String,
    pub env: String,
    pub zone: String,
    /// Fingerprint of the resolved current content
    pub version: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub published_at: Option<DateTime>,
}

impl Model {
    /// File name as deployed on hosts, e.g. `app.toml`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
