//! Fleet inventory backed by the relational store

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use fleetconf_persistence::entity::{app_info, app_node};

use super::{FleetInventory, NodeFilter};

/// Reads `app_info` / `app_node` rows
#[derive(Clone, Debug)]
pub struct SqlFleetInventory {
    db: DatabaseConnection,
}

impl SqlFleetInventory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FleetInventory for SqlFleetInventory {
    async fn get_app(&self, aid: i32) -> anyhow::Result<Option<app_info::Model>> {
        Ok(app_info::Entity::find_by_id(aid).one(&self.db).await?)
    }

    async fn find_app_by_name(&self, app_name: &str) -> anyhow::Result<Option<app_info::Model>> {
        Ok(app_info::Entity::find()
            .filter(app_info::Column::AppName.eq(app_name))
            .one(&self.db)
            .await?)
    }

    async fn get_all_app_node_list(
        &self,
        filter: &NodeFilter,
    ) -> anyhow::Result<Vec<app_node::Model>> {
        let mut query = app_node::Entity::find().filter(app_node::Column::Aid.eq(filter.aid));

        if let Some(ref env) = filter.env {
            query = query.filter(app_node::Column::Env.eq(env.as_str()));
        }
        if let Some(ref zone_code) = filter.zone_code {
            query = query.filter(app_node::Column::ZoneCode.eq(zone_code.as_str()));
        }
        if let Some(ref host_name) = filter.host_name {
            query = query.filter(app_node::Column::HostName.eq(host_name.as_str()));
        }

        Ok(query
            .order_by_asc(app_node::Column::Id)
            .all(&self.db)
            .await?)
    }
}
