// Per-instance views returned by the reconciler and the remote fetcher

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Unified status of one instance for one configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatusView {
    pub configuration_status_id: i32,
    pub env: String,
    pub ip: String,
    pub host_name: String,
    pub device_id: i32,
    pub region_code: String,
    pub region_name: String,
    pub zone_code: String,
    pub zone_name: String,
    pub config_file_path: String,
    pub config_file_used: i32,
    pub config_file_synced: i32,
    pub config_file_take_effect: i32,
    pub sync_at: NaiveDateTime,
    pub version: String,
    pub change_log: String,
}

/// Signal a probe reports on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusField {
    Used,
    Synced,
    TakeEffect,
}

impl StatusField {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusField::Used => "used",
            StatusField::Synced => "synced",
            StatusField::TakeEffect => "take_effect",
        }
    }
}

impl std::fmt::Display for StatusField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl InstanceStatusView {
    pub fn set(&mut self, field: StatusField, value: i32) {
        match field {
            StatusField::Used => self.config_file_used = value,
            StatusField::Synced => self.config_file_synced = value,
            StatusField::TakeEffect => self.config_file_take_effect = value,
        }
    }
}

/// Content of one deployed path as read from an instance's agent.
/// `error` is empty on success; `content` is empty on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfigItem {
    pub config_id: i32,
    pub file_name: String,
    pub content: String,
    pub error: String,
}
