//! Version ledger
//!
//! A version is the MD5 fingerprint of the *resolved* content, so two saves
//! are distinct only when the text an instance would actually receive
//! differs. Every save appends a history row and moves the configuration's
//! current pointer in one transaction.

use chrono::Local;
use md5::{Digest, Md5};
use sea_orm::*;
use tracing::{error, info};

use fleetconf_common::{FleetconfError, Result};
use fleetconf_persistence::entity::{
    config_resource_value, configuration, configuration_history, configuration_resource_relation,
};

use crate::context::EngineContext;
use crate::model::Author;

/// Lowercase hex MD5 of the resolved content
pub fn compute_fingerprint(resolved: &str) -> String {
    const_hex::encode(Md5::digest(resolved.as_bytes()))
}

/// Resource values referenced by raw content
pub async fn parse_config_resource_values(
    ctx: &EngineContext,
    content: &str,
) -> Result<Vec<config_resource_value::Model>> {
    let ids: Vec<i32> = ctx
        .resolver
        .parse_resource_from_config(content)
        .into_iter()
        .map(|r| r.version)
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    config_resource_value::Entity::find()
        .filter(config_resource_value::Column::Id.is_in(ids))
        .all(&ctx.db)
        .await
        .map_err(|e| {
            error!("load config resource values failed: {}", e);
            e.into()
        })
}

/// Record `content` as the new current version of a configuration.
///
/// Returns the id of the new history entry. Fails with `Conflict` when the
/// resolved content is identical to the current one.
pub async fn save_new_version(
    ctx: &EngineContext,
    config_id: i32,
    content: &str,
    author: Author,
    change_log: &str,
) -> Result<i32> {
    let current = configuration::Entity::find_by_id(config_id)
        .one(&ctx.db)
        .await?
        .ok_or_else(|| FleetconfError::not_found(format!("configuration {}", config_id)))?;

    let (resolved, current_resolved) = tokio::try_join!(
        ctx.resolver.fill_config_resource(content),
        ctx.resolver.fill_config_resource(&current.content)
    )
    .map_err(FleetconfError::upstream)?;

    let version = compute_fingerprint(&resolved);
    if version == compute_fingerprint(&current_resolved) {
        return Err(FleetconfError::Conflict(format!(
            "configuration {} already holds version {}",
            config_id, version
        )));
    }

    let resource_values = parse_config_resource_values(ctx, content).await?;
    let now = Local::now().naive_local();

    let txn = ctx.db.begin().await?;

    // Last writer wins for a fingerprint
    configuration_history::Entity::delete_many()
        .filter(configuration_history::Column::Version.eq(version.as_str()))
        .exec(&txn)
        .await?;

    let history = configuration_history::ActiveModel {
        configuration_id: Set(config_id),
        content: Set(content.to_string()),
        version: Set(version.clone()),
        uid: Set(author.uid()),
        access_token_id: Set(author.access_token_id()),
        change_log: Set(change_log.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if !resource_values.is_empty() {
        let relations = resource_values
            .iter()
            .map(|value| configuration_resource_relation::ActiveModel {
                configuration_history_id: Set(history.id),
                config_resource_value_id: Set(value.id),
                ..Default::default()
            });
        configuration_resource_relation::Entity::insert_many(relations)
            .on_empty_do_nothing()
            .exec(&txn)
            .await?;
    }

    let mut active: configuration::ActiveModel = current.into();
    active.content = Set(content.to_string());
    active.version = Set(version.clone());
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;

    info!(
        config_id,
        history_id = history.id,
        version = %version,
        "configuration version saved"
    );

    Ok(history.id)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_fingerprint_known_values() {
        assert_eq!(compute_fingerprint(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            compute_fingerprint("hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    proptest! {
        #[test]
        fn test_fingerprint_shape(content in ".*") {
            let fingerprint = compute_fingerprint(&content);
            prop_assert_eq!(fingerprint.len(), 32);
            prop_assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            prop_assert_eq!(fingerprint, compute_fingerprint(&content));
        }
    }
}
