//! Publish orchestration
//!
//! Publishing one history entry happens in two phases:
//! 1. `PublishPlan::prepare` loads everything and builds the payload. Nothing
//!    is written.
//! 2. `PublishPlan::commit_store` writes every key under one shared deadline
//!    and yields a `StoreCommitted` token, which is the only way to reach
//!    `StoreCommitted::commit_ledger`. The ledger transaction therefore never
//!    runs unless every key-value write succeeded.
//!
//! Keys already written when a later write fails stay in the store; callers
//! see `UpstreamFailure` and no ledger rows.

use chrono::{Local, Utc};
use sea_orm::*;
use tracing::{debug, error, info, warn};

use fleetconf_common::{FleetconfError, Result, VERSION_HEADER_FORMAT, VERSION_HEADER_KEY};
use fleetconf_persistence::entity::{
    app_info, configuration, configuration_history, configuration_publish, configuration_status,
};

use crate::collaborator::{KvStore, NodeFilter};
use crate::context::EngineContext;
use crate::model::{Metadata, PublishData, PublishEvent, PublishReceipt, UniqZone};

use super::path::resolve_paths;

/// Prefix toml content with a version header line. Other formats pass
/// through untouched.
pub fn configuration_header(content: &str, format: &str, version: &str) -> String {
    if format == VERSION_HEADER_FORMAT {
        format!("{} = \"{}\"\n{}", VERSION_HEADER_KEY, version, content)
    } else {
        content.to_string()
    }
}

/// Key watched by the agent of one host
pub fn host_key(
    prefix: &str,
    host_name: &str,
    app_name: &str,
    env: &str,
    file_name: &str,
    govern_port: &str,
) -> String {
    format!(
        "/{}/{}/{}/{}/static/{}/{}",
        prefix, host_name, app_name, env, file_name, govern_port
    )
}

/// Key watched by cluster-mode consumers
pub fn cluster_key(prefix: &str, app_name: &str, env: &str, file_name: &str) -> String {
    format!("/{}/cluster/{}/{}/static/{}", prefix, app_name, env, file_name)
}

/// Everything needed to publish one history entry, computed up front
#[derive(Debug)]
pub struct PublishPlan {
    configuration: configuration::Model,
    history: configuration_history::Model,
    app: app_info::Model,
    zone: UniqZone,
    file_name: String,
    instances: Vec<String>,
    paths: Vec<String>,
    file_path: String,
    payload: String,
}

impl PublishPlan {
    pub async fn prepare(ctx: &EngineContext, config_id: i32, history_id: i32) -> Result<Self> {
        let configuration = configuration::Entity::find_by_id(config_id)
            .one(&ctx.db)
            .await?
            .ok_or_else(|| FleetconfError::not_found(format!("configuration {}", config_id)))?;

        let history = configuration_history::Entity::find_by_id(history_id)
            .one(&ctx.db)
            .await?
            .filter(|h| h.configuration_id == config_id)
            .ok_or_else(|| {
                FleetconfError::not_found(format!(
                    "history {} of configuration {}",
                    history_id, config_id
                ))
            })?;

        let resolved = ctx
            .resolver
            .fill_config_resource(&history.content)
            .await
            .map_err(FleetconfError::upstream)?;

        let instances =
            publish_instances(ctx, configuration.aid, &configuration.env, &configuration.zone)
                .await?;

        let app = ctx
            .inventory
            .get_app(configuration.aid)
            .await
            .map_err(FleetconfError::upstream)?
            .ok_or_else(|| FleetconfError::not_found(format!("app {}", configuration.aid)))?;

        let file_name = configuration.file_name();
        let (paths, file_path) = resolve_paths(&ctx.settings.dirs, &app.app_name, &file_name);

        let content = configuration_header(&resolved, &configuration.format, &history.version);
        debug!(config_id, history_id, "publish content: {}", content);

        let payload = serde_json::to_string(&PublishData {
            content,
            metadata: Metadata {
                timestamp: Utc::now().timestamp(),
                format: configuration.format.clone(),
                version: history.version.clone(),
                paths: paths.clone(),
            },
        })?;

        Ok(Self {
            zone: UniqZone::new(configuration.env.clone(), configuration.zone.clone()),
            configuration,
            history,
            app,
            file_name,
            instances,
            paths,
            file_path,
            payload,
        })
    }

    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Every key this plan writes, in write order
    pub fn keys(&self, prefixes: &[String]) -> Vec<String> {
        let app_name = &self.app.app_name;
        let env = &self.configuration.env;

        self.instances
            .iter()
            .flat_map(|host| {
                prefixes.iter().flat_map(move |prefix| {
                    [
                        host_key(
                            prefix,
                            host,
                            app_name,
                            env,
                            &self.file_name,
                            &self.app.govern_port,
                        ),
                        cluster_key(prefix, app_name, env, &self.file_name),
                    ]
                })
            })
            .collect()
    }

    /// Write every key under the shared publish deadline
    pub async fn commit_store(self, ctx: &EngineContext) -> Result<StoreCommitted> {
        let keys = self.keys(&ctx.settings.prefixes);
        let deadline = ctx.settings.publish_timeout;

        let keys_written =
            tokio::time::timeout(deadline, self.write_keys(ctx.kv.as_ref(), &keys))
                .await
                .map_err(|_| {
                    error!(
                        config_id = self.configuration.id,
                        zone = %self.zone,
                        "kv fan-out exceeded {:?}",
                        deadline
                    );
                    FleetconfError::UpstreamFailure(format!(
                        "kv fan-out exceeded {:?}",
                        deadline
                    ))
                })??;

        Ok(StoreCommitted {
            plan: self,
            keys_written,
        })
    }

    async fn write_keys(&self, kv: &dyn KvStore, keys: &[String]) -> Result<usize> {
        for key in keys {
            kv.put(&self.zone, key, &self.payload).await.map_err(|e| {
                error!(zone = %self.zone, key = %key, "kv put failed: {:#}", e);
                FleetconfError::UpstreamFailure(format!("kv put {}: {:#}", key, e))
            })?;
        }

        Ok(keys.len())
    }
}

/// Proof that every key of a plan reached the key-value store
#[derive(Debug)]
pub struct StoreCommitted {
    plan: PublishPlan,
    keys_written: usize,
}

impl StoreCommitted {
    pub fn keys_written(&self) -> usize {
        self.keys_written
    }

    /// Record the publish: one publish row, one zeroed status row per
    /// instance, and the configuration's publish time, atomically. The audit
    /// event follows the commit and its failure is only logged.
    pub async fn commit_ledger(self, ctx: &EngineContext, uid: i32) -> Result<PublishReceipt> {
        let StoreCommitted { plan, keys_written } = self;
        let now = Local::now().naive_local();
        let apply_instance = serde_json::to_string(&plan.instances)?;

        let txn = ctx.db.begin().await?;

        let record = configuration_publish::ActiveModel {
            configuration_id: Set(plan.configuration.id),
            configuration_history_id: Set(plan.history.id),
            apply_instance: Set(apply_instance),
            file_path: Set(plan.file_path.clone()),
            uid: Set(uid),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let statuses = plan
            .instances
            .iter()
            .map(|host| configuration_status::ActiveModel {
                configuration_id: Set(plan.configuration.id),
                configuration_publish_id: Set(record.id),
                host_name: Set(host.clone()),
                used: Set(0),
                synced: Set(0),
                take_effect: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            });
        configuration_status::Entity::insert_many(statuses)
            .on_empty_do_nothing()
            .exec(&txn)
            .await?;

        let mut active: configuration::ActiveModel = plan.configuration.clone().into();
        active.published_at = Set(Some(now));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            config_id = plan.configuration.id,
            history_id = plan.history.id,
            publish_id = record.id,
            instances = plan.instances.len(),
            keys_written,
            "configuration published"
        );

        let event = PublishEvent {
            aid: plan.app.aid,
            app_name: plan.app.app_name.clone(),
            env: plan.configuration.env.clone(),
            zone_code: plan.configuration.zone.clone(),
            metadata: serde_json::to_string(&record)?,
            operator_uid: uid,
        };
        if let Err(e) = ctx.events.config_publish_event(&event).await {
            warn!(publish_id = record.id, "publish event failed: {:#}", e);
        }

        Ok(PublishReceipt {
            publish_id: record.id,
            configuration_id: plan.configuration.id,
            configuration_history_id: plan.history.id,
            version: plan.history.version,
            instances: plan.instances,
            file_path: plan.file_path,
            keys_written,
        })
    }
}

async fn publish_instances(
    ctx: &EngineContext,
    aid: i32,
    env: &str,
    zone_code: &str,
) -> Result<Vec<String>> {
    let nodes = ctx
        .inventory
        .get_all_app_node_list(&NodeFilter::new(aid).env(env).zone_code(zone_code))
        .await
        .map_err(FleetconfError::upstream)?;

    if nodes.is_empty() {
        return Err(FleetconfError::NoInstances {
            aid,
            env: env.to_string(),
            zone_code: zone_code.to_string(),
        });
    }

    Ok(nodes.into_iter().map(|n| n.host_name).collect())
}

/// Publish a history entry of a configuration to every instance in its zone
pub async fn publish(
    ctx: &EngineContext,
    config_id: i32,
    history_id: i32,
    uid: i32,
) -> Result<PublishReceipt> {
    let plan = PublishPlan::prepare(ctx, config_id, history_id).await?;
    let committed = plan.commit_store(ctx).await?;
    committed.commit_ledger(ctx, uid).await
}

/// Publish the history entry of a configuration carrying `version`
pub async fn publish_version(
    ctx: &EngineContext,
    config_id: i32,
    version: &str,
    uid: i32,
) -> Result<PublishReceipt> {
    let history = configuration_history::Entity::find()
        .filter(configuration_history::Column::ConfigurationId.eq(config_id))
        .filter(configuration_history::Column::Version.eq(version))
        .order_by_desc(configuration_history::Column::Id)
        .one(&ctx.db)
        .await?
        .ok_or_else(|| {
            FleetconfError::not_found(format!(
                "version {} of configuration {}",
                version, config_id
            ))
        })?;

    publish(ctx, config_id, history.id, uid).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_header() {
        assert_eq!(
            configuration_header("a = 1\n", "toml", "abc"),
            "fleetconf_configuration_version = \"abc\"\na = 1\n"
        );
    }

    #[test]
    fn test_non_toml_untouched() {
        assert_eq!(configuration_header("a: 1\n", "yaml", "abc"), "a: 1\n");
        assert_eq!(configuration_header("{}", "json", "abc"), "{}");
    }

    #[test]
    fn test_key_formats() {
        assert_eq!(
            host_key("fleetconf-agent", "h1", "svc", "dev", "app.toml", "9090"),
            "/fleetconf-agent/h1/svc/dev/static/app.toml/9090"
        );
        assert_eq!(
            cluster_key("fleetconf-cluster", "svc", "dev", "app.toml"),
            "/fleetconf-cluster/cluster/svc/dev/static/app.toml"
        );
    }
}
