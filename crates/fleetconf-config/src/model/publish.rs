// Publish payloads: the key-value envelope, the receipt and the audit event

use serde::{Deserialize, Serialize};

/// Metadata carried next to the published content
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub timestamp: i64,
    pub format: String,
    pub version: String,
    pub paths: Vec<String>,
}

/// JSON envelope written under every key-value store key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishData {
    pub content: String,
    pub metadata: Metadata,
}

/// Outcome of a successful publish
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub publish_id: i32,
    pub configuration_id: i32,
    pub configuration_history_id: i32,
    pub version: String,
    pub instances: Vec<String>,
    pub file_path: String,
    pub keys_written: usize,
}

/// Audit event emitted after the publish transaction commits
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEvent {
    pub aid: i32,
    pub app_name: String,
    pub env: String,
    pub zone_code: String,
    /// Serialized publish record
    pub metadata: String,
    pub operator_uid: i32,
}
