//! Remote content fetcher
//!
//! Reads what an instance actually has on disk for every planned path. One
//! failing path never hides the others: each yields its own item carrying
//! either content or an error.

use std::sync::Arc;

use futures::future::join_all;
use sea_orm::EntityTrait;
use serde::Deserialize;
use tracing::{debug, warn};

use fleetconf_common::{FleetconfError, Result};
use fleetconf_persistence::entity::configuration;

use crate::collaborator::{AgentProxy, AgentResponse, Decryptor, NodeFilter, ProxyRequest};
use crate::context::EngineContext;
use crate::model::{InstanceConfigItem, UniqZone};

use super::path::resolve_paths;

/// Agent endpoint serving the encrypted content of a local file
pub const AGENT_FILE_URL: &str = "/api/agent/file";

#[derive(Debug, Default, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
}

async fn read_remote_file(
    proxy: Arc<dyn AgentProxy>,
    decryptor: Arc<dyn Decryptor>,
    zone: UniqZone,
    req: ProxyRequest,
) -> Result<String> {
    let body = proxy
        .http_get(&zone, &req)
        .await
        .map_err(FleetconfError::upstream)?;

    let file = serde_json::from_slice::<AgentResponse<FileContent>>(&body)?
        .into_data()
        .map_err(FleetconfError::upstream)?;

    decryptor.decrypt(&file.content).map_err(|e| {
        FleetconfError::DecryptionFailure(format!("config file decrypt failed: {}", e))
    })
}

/// Content of every planned path of a configuration on one host, in path
/// order
pub async fn read_instance_config(
    ctx: &EngineContext,
    config_id: i32,
    host_name: &str,
) -> Result<Vec<InstanceConfigItem>> {
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

    let node = ctx
        .inventory
        .get_all_app_node_list(&NodeFilter::new(app.aid).host_name(host_name))
        .await
        .map_err(FleetconfError::upstream)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            FleetconfError::not_found(format!("host {} of app {}", host_name, app.app_name))
        })?;

    let zone = UniqZone::new(configuration.env.clone(), configuration.zone.clone());
    let (paths, _) = resolve_paths(
        &ctx.settings.dirs,
        &app.app_name,
        &configuration.file_name(),
    );
    let address = format!("{}:{}", node.ip, ctx.settings.agent_port);

    let tasks = paths.iter().map(|path| {
        let req = ProxyRequest::get(address.clone(), AGENT_FILE_URL).param("file_name", path.clone());
        tokio::spawn(read_remote_file(
            ctx.proxy.clone(),
            ctx.decryptor.clone(),
            zone.clone(),
            req,
        ))
    });
    let outcomes = join_all(tasks).await;

    let items = paths
        .into_iter()
        .zip(outcomes)
        .map(|(path, outcome)| {
            let mut item = InstanceConfigItem {
                config_id,
                file_name: path,
                ..Default::default()
            };
            match outcome {
                Ok(Ok(content)) => item.content = content,
                Ok(Err(e)) => {
                    warn!(config_id, host = %host_name, path = %item.file_name, "read config file failed: {}", e);
                    item.error = e.to_string();
                }
                Err(e) => {
                    warn!(config_id, host = %host_name, path = %item.file_name, "read task aborted: {}", e);
                    item.error = format!("read task aborted: {}", e);
                }
            }
            item
        })
        .collect::<Vec<_>>();

    debug!(config_id, host = %host_name, paths = items.len(), "instance config read");
    Ok(items)
}
