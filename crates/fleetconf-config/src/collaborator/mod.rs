//! External collaborators of the engine
//!
//! The engine talks to the outside world only through these traits:
//! - `KvStore`: the distributed key-value store instances watch
//! - `FleetInventory`: applications and their running nodes
//! - `ResourceResolver`: placeholder expansion inside raw content
//! - `AgentProxy`: proxied HTTP calls to host agents
//! - `Decryptor`: decryption of agent file payloads
//! - `EventSink`: fire-and-forget audit events
//! - `StatusProbe`: live per-instance status signals
//!
//! Implementations backed by the relational store and by the zone client
//! proxy live in the submodules.

pub mod event;
pub mod inventory;
pub mod probe;
pub mod proxy;
pub mod resolver;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fleetconf_common::{AgentCipher, CryptoError};
use fleetconf_persistence::entity::{app_info, app_node, configuration};

use crate::model::{PublishEvent, UniqZone};

pub use event::OperationLogSink;
pub use inventory::SqlFleetInventory;
pub use probe::{AgentUsedProbe, NoopProbe, SyncedProbe, TakeEffectProbe};
pub use proxy::{ProxyClient, ProxyRoute};
pub use resolver::SqlResourceResolver;

/// Distributed key-value store
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn put(&self, zone: &UniqZone, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Node query. Unset fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub aid: i32,
    pub env: Option<String>,
    pub zone_code: Option<String>,
    pub host_name: Option<String>,
}

impl NodeFilter {
    pub fn new(aid: i32) -> Self {
        Self {
            aid,
            ..Default::default()
        }
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn zone_code(mut self, zone_code: impl Into<String>) -> Self {
        self.zone_code = Some(zone_code.into());
        self
    }

    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }
}

/// Fleet inventory: applications and their nodes
#[async_trait]
pub trait FleetInventory: Send + Sync {
    async fn get_app(&self, aid: i32) -> anyhow::Result<Option<app_info::Model>>;

    async fn find_app_by_name(&self, app_name: &str) -> anyhow::Result<Option<app_info::Model>>;

    async fn get_all_app_node_list(&self, filter: &NodeFilter)
    -> anyhow::Result<Vec<app_node::Model>>;
}

/// A resource value referenced from configuration content.
/// `version` is the resource value id, globally unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    pub version: i32,
}

/// Resource placeholder resolution
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Expand every placeholder into its concrete value
    async fn fill_config_resource(&self, content: &str) -> anyhow::Result<String>;

    /// Resource references contained in raw content
    fn parse_resource_from_config(&self, content: &str) -> Vec<ResourceRef>;
}

/// Request relayed by the zone proxy to a host
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub address: String,
    pub url: String,
    #[serde(rename = "type")]
    pub method: String,
    pub params: BTreeMap<String, String>,
}

impl ProxyRequest {
    pub fn get(address: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            url: url.into(),
            method: "GET".to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Proxied HTTP access to host agents and application endpoints
#[async_trait]
pub trait AgentProxy: Send + Sync {
    /// Returns the raw response body
    async fn http_get(&self, zone: &UniqZone, req: &ProxyRequest) -> anyhow::Result<Vec<u8>>;
}

/// Response envelope of host agents: `{code, msg, data}`, code 200 on success
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AgentResponse<T> {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: T,
}

impl<T> AgentResponse<T> {
    pub fn into_data(self) -> anyhow::Result<T> {
        if self.code != 200 {
            anyhow::bail!("agent responded with code {}: {}", self.code, self.msg);
        }
        Ok(self.data)
    }
}

/// Decryption of agent payloads
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, cipher_text: &str) -> Result<String, CryptoError>;
}

impl Decryptor for AgentCipher {
    fn decrypt(&self, cipher_text: &str) -> Result<String, CryptoError> {
        AgentCipher::decrypt(self, cipher_text)
    }
}

/// Audit event sink
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn config_publish_event(&self, event: &PublishEvent) -> anyhow::Result<()>;
}

/// What a probe needs to know about the instances it inspects
#[derive(Clone, Debug)]
pub struct ProbeContext {
    pub app: app_info::Model,
    pub zone: UniqZone,
    pub configuration: configuration::Model,
    /// Joined storage path of the latest publish
    pub file_path: String,
    /// Version of the latest published history entry
    pub version: String,
    pub nodes: Vec<app_node::Model>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProbeError(pub String);

/// Per-host probe outcome keyed by host name
pub type HostCorrections = HashMap<String, Result<i32, ProbeError>>;

/// Live status signal source
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<HostCorrections>;
}
