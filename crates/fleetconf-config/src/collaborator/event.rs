//! Audit event sinks

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::info;

use fleetconf_persistence::entity::operation_log;

use crate::model::PublishEvent;

use super::EventSink;

/// Operation type constants
pub mod operation {
    pub const PUBLISH: &str = "PUBLISH";
}

/// Resource type constants
pub mod resource {
    pub const CONFIG: &str = "CONFIG";
}

/// Operation result constants
pub mod result {
    pub const SUCCESS: &str = "SUCCESS";
}

/// Writes publish events to the `operation_log` table
#[derive(Clone, Debug)]
pub struct OperationLogSink {
    db: DatabaseConnection,
}

impl OperationLogSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventSink for OperationLogSink {
    async fn config_publish_event(&self, event: &PublishEvent) -> anyhow::Result<()> {
        let active = operation_log::ActiveModel {
            operation: Set(operation::PUBLISH.to_string()),
            resource_type: Set(resource::CONFIG.to_string()),
            resource_id: Set(Some(format!(
                "{}@@{}@@{}",
                event.app_name, event.env, event.zone_code
            ))),
            aid: Set(event.aid),
            operator: Set(event.operator_uid.to_string()),
            result: Set(result::SUCCESS.to_string()),
            details: Set(Some(event.metadata.clone())),
            gmt_create: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        let record = active.insert(&self.db).await?;
        info!(
            log_id = record.id,
            app = %event.app_name,
            env = %event.env,
            zone = %event.zone_code,
            operator = event.operator_uid,
            "config publish recorded"
        );
        Ok(())
    }
}
