// Configuration views, forms and history models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use fleetconf_persistence::entity::{configuration, configuration_history};

/// Who authored a new version. Exactly one identity is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Author {
    User(i32),
    AccessToken(i32),
}

impl Author {
    pub fn uid(&self) -> Option<i32> {
        match self {
            Author::User(uid) => Some(*uid),
            Author::AccessToken(_) => None,
        }
    }

    pub fn access_token_id(&self) -> Option<i32> {
        match self {
            Author::User(_) => None,
            Author::AccessToken(id) => Some(*id),
        }
    }
}

/// Environment and zone pair addressing one proxy / key-value cluster
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqZone {
    pub env: String,
    pub zone: String,
}

impl UniqZone {
    pub fn new(env: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            zone: zone.into(),
        }
    }
}

impl std::fmt::Display for UniqZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.env, self.zone)
    }
}

// Form for creating an empty configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateConfigForm {
    pub app_name: String,
    pub env: String,
    pub zone: String,
    /// File name without the format suffix
    pub file_name: String,
    pub format: String,
}

// List item, without content
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub id: i32,
    pub aid: i32,
    pub name: String,
    pub format: String,
    pub env: String,
    pub zone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
}

impl From<configuration::Model> for ConfigurationItem {
    fn from(value: configuration::Model) -> Self {
        Self {
            id: value.id,
            aid: value.aid,
            name: value.name,
            format: value.format,
            env: value.env,
            zone: value.zone,
            created_at: value.created_at,
            updated_at: value.updated_at,
            published_at: value.published_at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDetail {
    pub id: i32,
    pub aid: i32,
    pub name: String,
    pub content: String,
    pub format: String,
    pub env: String,
    pub zone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
}

impl From<configuration::Model> for ConfigurationDetail {
    fn from(value: configuration::Model) -> Self {
        Self {
            id: value.id,
            aid: value.aid,
            name: value.name,
            content: value.content,
            format: value.format,
            env: value.env,
            zone: value.zone,
            created_at: value.created_at,
            updated_at: value.updated_at,
            published_at: value.published_at,
        }
    }
}

impl ConfigurationDetail {
    /// Detail view of a history entry: its own id, content and creation time
    /// over the owning configuration's attributes
    pub fn from_history(
        history: configuration_history::Model,
        configuration: &configuration::Model,
    ) -> Self {
        Self {
            id: history.id,
            aid: configuration.aid,
            name: configuration.name.clone(),
            content: history.content,
            format: configuration.format.clone(),
            env: configuration.env.clone(),
            zone: configuration.zone.clone(),
            created_at: history.created_at,
            updated_at: configuration.updated_at,
            published_at: configuration.published_at,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: i32,
    pub uid: Option<i32>,
    pub access_token_id: Option<i32>,
    pub configuration_id: i32,
    pub version: String,
    pub change_log: String,
    pub created_at: NaiveDateTime,
}

impl From<configuration_history::Model> for HistoryItem {
    fn from(value: configuration_history::Model) -> Self {
        Self {
            id: value.id,
            uid: value.uid,
            access_token_id: value.access_token_id,
            configuration_id: value.configuration_id,
            version: value.version,
            change_log: value.change_log,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: u64,
    pub page_size: u64,
    pub total: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub list: Vec<HistoryItem>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub origin: Option<ConfigurationDetail>,
    pub modified: ConfigurationDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_identity_is_exclusive() {
        let user = Author::User(12);
        assert_eq!(user.uid(), Some(12));
        assert_eq!(user.access_token_id(), None);

        let token = Author::AccessToken(4);
        assert_eq!(token.uid(), None);
        assert_eq!(token.access_token_id(), Some(4));
    }

    #[test]
    fn test_uniq_zone_display() {
        assert_eq!(UniqZone::new("prod", "bj").to_string(), "prod/bj");
    }

    #[test]
    fn test_create_form_defaults() {
        let form: CreateConfigForm =
            serde_json::from_str(r#"{"appName":"svc","fileName":"app"}"#).unwrap();
        assert_eq!(form.app_name, "svc");
        assert_eq!(form.file_name, "app");
        assert!(form.format.is_empty());
    }
}
