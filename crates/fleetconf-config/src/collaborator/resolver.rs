//! Resource resolver backed by the `config_resource_value` table
//!
//! Placeholders take the form `{{name@version}}` where `version` is the id of
//! a resource value row. Placeholders naming an unknown value are left as-is.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::warn;

use fleetconf_persistence::entity::config_resource_value;

use super::{ResourceRef, ResourceResolver};

static RESOURCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)@(\d+)\s*\}\}").expect("Invalid resource pattern")
});

/// Parse every `{{name@version}}` reference, in order of appearance
pub fn parse_resource_refs(content: &str) -> Vec<ResourceRef> {
    RESOURCE_PATTERN
        .captures_iter(content)
        .filter_map(|caps| {
            let version = caps[2].parse::<i32>().ok()?;
            Some(ResourceRef {
                name: caps[1].to_string(),
                version,
            })
        })
        .collect()
}

/// Replace every reference whose version has a value in `values`
pub fn fill_resource_refs(content: &str, values: &HashMap<i32, String>) -> String {
    RESOURCE_PATTERN
        .replace_all(content, |caps: &Captures| {
            caps[2]
                .parse::<i32>()
                .ok()
                .and_then(|version| values.get(&version).cloned())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Clone, Debug)]
pub struct SqlResourceResolver {
    db: DatabaseConnection,
}

impl SqlResourceResolver {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResourceResolver for SqlResourceResolver {
    async fn fill_config_resource(&self, content: &str) -> anyhow::Result<String> {
        let refs = parse_resource_refs(content);
        if refs.is_empty() {
            return Ok(content.to_string());
        }

        let ids: Vec<i32> = refs.iter().map(|r| r.version).collect();
        let values: HashMap<i32, String> = config_resource_value::Entity::find()
            .filter(config_resource_value::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|v| (v.id, v.value))
            .collect();

        for r in refs.iter().filter(|r| !values.contains_key(&r.version)) {
            warn!(
                resource = %r.name,
                version = r.version,
                "resource value not found, placeholder kept"
            );
        }

        Ok(fill_resource_refs(content, &values))
    }

    fn parse_resource_from_config(&self, content: &str) -> Vec<ResourceRef> {
        parse_resource_refs(content)
    }
}
