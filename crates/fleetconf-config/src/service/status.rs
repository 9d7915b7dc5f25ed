//! Instance status reconciliation
//!
//! The stored status rows are the baseline. Three live probes run
//! concurrently and overwrite the matching signal for every host they could
//! reach; a failed probe or host leaves the stored value in place.

use std::collections::HashMap;

use chrono::Local;
use sea_orm::*;
use tracing::{debug, warn};

use fleetconf_common::{FleetconfError, Result};
use fleetconf_persistence::entity::{
    app_node, configuration, configuration_history, configuration_publish, configuration_status,
};

use crate::collaborator::{HostCorrections, NodeFilter, ProbeContext};
use crate::context::EngineContext;
use crate::model::{InstanceStatusView, StatusField, UniqZone};

async fn latest_status(
    db: &DatabaseConnection,
    config_id: i32,
    host_name: &str,
) -> std::result::Result<Option<configuration_status::Model>, DbErr> {
    configuration_status::Entity::find()
        .filter(configuration_status::Column::ConfigurationId.eq(config_id))
        .filter(configuration_status::Column::HostName.eq(host_name))
        .order_by_desc(configuration_status::Column::Id)
        .one(db)
        .await
}

#[derive(Clone, Debug, Default)]
struct PublishInfo {
    file_path: String,
    version: String,
    change_log: String,
}

async fn publish_info(db: &DatabaseConnection, publish_id: i32) -> Result<PublishInfo> {
    let Some(record) = configuration_publish::Entity::find_by_id(publish_id)
        .one(db)
        .await?
    else {
        return Ok(PublishInfo::default());
    };

    let history = configuration_history::Entity::find_by_id(record.configuration_history_id)
        .one(db)
        .await?;

    Ok(PublishInfo {
        file_path: record.file_path,
        version: history.as_ref().map(|h| h.version.clone()).unwrap_or_default(),
        change_log: history.map(|h| h.change_log).unwrap_or_default(),
    })
}

fn base_view(
    node: &app_node::Model,
    status: &configuration_status::Model,
    info: &PublishInfo,
) -> InstanceStatusView {
    InstanceStatusView {
        configuration_status_id: status.id,
        env: node.env.clone(),
        ip: node.ip.clone(),
        host_name: node.host_name.clone(),
        device_id: node.device_id,
        region_code: node.region_code.clone(),
        region_name: node.region_name.clone(),
        zone_code: node.zone_code.clone(),
        zone_name: node.zone_name.clone(),
        config_file_path: info.file_path.clone(),
        config_file_used: status.used,
        config_file_synced: status.synced,
        config_file_take_effect: status.take_effect,
        sync_at: Local::now().naive_local(),
        version: info.version.clone(),
        change_log: info.change_log.clone(),
    }
}

/// Merge one probe outcome into the views
pub fn apply_corrections(
    views: &mut [InstanceStatusView],
    field: StatusField,
    outcome: anyhow::Result<HostCorrections>,
) {
    let corrections = match outcome {
        Ok(corrections) => corrections,
        Err(e) => {
            warn!(%field, "status probe failed, keeping stored values: {:#}", e);
            return;
        }
    };

    for view in views.iter_mut() {
        match corrections.get(&view.host_name) {
            Some(Ok(value)) => view.set(field, *value),
            Some(Err(e)) => {
                warn!(%field, host = %view.host_name, "status probe failed for host: {}", e)
            }
            None => {}
        }
    }
}

/// Status of every instance of a configuration in one zone.
///
/// Nodes that never received a publish of this configuration are not listed.
pub async fn list_instance_status(
    ctx: &EngineContext,
    config_id: i32,
    env: &str,
    zone_code: &str,
) -> Result<Vec<InstanceStatusView>> {
    let configuration = configuration::Entity::find_by_id(config_id)
        .one(&ctx.db)
        .await?
        .ok_or_else(|| FleetconfError::not_found(format!("configuration {}", config_id)))?;

    let app = ctx
        .inventory
        .get_app(configuration.aid)
        .await
        .map_err(FleetconfError::upstream)?
        .ok_or_else(|| FleetconfError::not_found(format!("app {}", configuration.aid)))?;

    let nodes = ctx
        .inventory
        .get_all_app_node_list(&NodeFilter::new(configuration.aid).env(env).zone_code(zone_code))
        .await
        .map_err(FleetconfError::upstream)?;

    let mut publishes: HashMap<i32, PublishInfo> = HashMap::new();
    let mut views = Vec::with_capacity(nodes.len());
    let mut listed = Vec::with_capacity(nodes.len());
    let mut latest: Option<(i32, PublishInfo)> = None;

    for node in nodes {
        let status = match latest_status(&ctx.db, config_id, &node.host_name).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                debug!(config_id, host = %node.host_name, "no publish record, skipped");
                continue;
            }
            Err(e) => {
                warn!(config_id, host = %node.host_name, "load status failed: {}", e);
                continue;
            }
        };

        let publish_id = status.configuration_publish_id;
        if !publishes.contains_key(&publish_id) {
            publishes.insert(publish_id, publish_info(&ctx.db, publish_id).await?);
        }
        let info = &publishes[&publish_id];

        if latest.as_ref().is_none_or(|(id, _)| *id < publish_id) {
            latest = Some((publish_id, info.clone()));
        }

        views.push(base_view(&node, &status, info));
        listed.push(node);
    }

    if views.is_empty() {
        return Ok(views);
    }

    let latest = latest.map(|(_, info)| info).unwrap_or_default();
    let probe_ctx = ProbeContext {
        app,
        zone: UniqZone::new(env, zone_code),
        configuration,
        file_path: latest.file_path,
        version: latest.version,
        nodes: listed,
    };

    let (used, synced, take_effect) = tokio::join!(
        ctx.probes.used.probe(&probe_ctx),
        ctx.probes.synced.probe(&probe_ctx),
        ctx.probes.take_effect.probe(&probe_ctx)
    );

    apply_corrections(&mut views, StatusField::Used, used);
    apply_corrections(&mut views, StatusField::Synced, synced);
    apply_corrections(&mut views, StatusField::TakeEffect, take_effect);

    Ok(views)
}
