//! Configuration CRUD

use chrono::Local;
use sea_orm::*;
use tracing::info;

use fleetconf_common::{FleetconfError, Result};
use fleetconf_persistence::entity::configuration;

use crate::collaborator::NodeFilter;
use crate::context::EngineContext;
use crate::model::{ConfigurationDetail, ConfigurationItem, CreateConfigForm};

/// Configurations of an application in one environment, without content
pub async fn list(
    ctx: &EngineContext,
    app_name: &str,
    env: &str,
) -> Result<Vec<ConfigurationItem>> {
    let app = ctx
        .inventory
        .find_app_by_name(app_name)
        .await
        .map_err(FleetconfError::upstream)?
        .ok_or_else(|| FleetconfError::not_found(format!("app {}", app_name)))?;

    let list = configuration::Entity::find()
        .filter(configuration::Column::Aid.eq(app.aid))
        .filter(configuration::Column::Env.eq(env))
        .order_by_asc(configuration::Column::Id)
        .all(&ctx.db)
        .await?;

    Ok(list.into_iter().map(ConfigurationItem::from).collect())
}

pub async fn detail(db: &DatabaseConnection, id: i32) -> Result<ConfigurationDetail> {
    configuration::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(ConfigurationDetail::from)
        .ok_or_else(|| FleetconfError::not_found(format!("configuration {}", id)))
}

fn validate(form: &CreateConfigForm) -> Result<()> {
    let required = [
        ("appName", &form.app_name),
        ("env", &form.env),
        ("zone", &form.zone),
        ("fileName", &form.file_name),
        ("format", &form.format),
    ];
    if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(FleetconfError::IllegalArgument(format!("{} is required", name)));
    }
    if form.file_name.contains('/') {
        return Err(FleetconfError::IllegalArgument(format!(
            "invalid file name {}",
            form.file_name
        )));
    }

    Ok(())
}

/// Create an empty configuration for an application in a zone-env that has
/// at least one node
pub async fn create(ctx: &EngineContext, form: &CreateConfigForm) -> Result<ConfigurationDetail> {
    validate(form)?;

    let app = ctx
        .inventory
        .find_app_by_name(&form.app_name)
        .await
        .map_err(FleetconfError::upstream)?
        .ok_or_else(|| FleetconfError::not_found(format!("app {}", form.app_name)))?;

    let nodes = ctx
        .inventory
        .get_all_app_node_list(&NodeFilter::new(app.aid).env(&form.env).zone_code(&form.zone))
        .await
        .map_err(FleetconfError::upstream)?;
    if nodes.is_empty() {
        return Err(FleetconfError::not_found(format!(
            "zone-env {}/{} of app {}",
            form.env, form.zone, form.app_name
        )));
    }

    let now = Local::now().naive_local();
    let txn = ctx.db.begin().await?;

    let exists = configuration::Entity::find()
        .filter(configuration::Column::Aid.eq(app.aid))
        .filter(configuration::Column::Env.eq(form.env.as_str()))
        .filter(configuration::Column::Name.eq(form.file_name.as_str()))
        .filter(configuration::Column::Format.eq(form.format.as_str()))
        .count(&txn)
        .await?;
    if exists != 0 {
        return Err(FleetconfError::Conflict(format!(
            "configuration {}.{} already exists",
            form.file_name, form.format
        )));
    }

    let created = configuration::ActiveModel {
        aid: Set(app.aid),
        name: Set(form.file_name.clone()),
        content: Set(String::new()),
        format: Set(form.format.clone()),
        env: Set(form.env.clone()),
        zone: Set(form.zone.clone()),
        version: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
        published_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(config_id = created.id, aid = app.aid, "configuration created");
    Ok(ConfigurationDetail::from(created))
}

/// Hard delete. Returns whether a row was removed.
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<bool> {
    let result = configuration::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Every configuration row, content included
pub async fn get_all_config_text(db: &DatabaseConnection) -> Result<Vec<configuration::Model>> {
    Ok(configuration::Entity::find()
        .order_by_asc(configuration::Column::Id)
        .all(db)
        .await?)
}
