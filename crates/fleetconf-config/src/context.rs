//! Engine context
//!
//! Every operation receives an `EngineContext` carrying the database handle,
//! the engine settings and the external collaborators. It is built once at
//! process start and shared by reference.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use fleetconf_common::FleetconfError;

use crate::collaborator::{
    AgentProxy, Decryptor, EventSink, FleetInventory, KvStore, NoopProbe, OperationLogSink,
    ResourceResolver, SqlFleetInventory, SqlResourceResolver, StatusProbe,
};

pub const DEFAULT_AGENT_PORT: u16 = 50010;
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(3);

/// Engine settings
#[derive(Clone, Debug)]
pub struct EngineSettings {
    /// Deployment root directories, canonical root first
    pub dirs: Vec<String>,
    /// Key-value namespace prefixes, one per deployment topology
    pub prefixes: Vec<String>,
    /// Port host agents listen on
    pub agent_port: u16,
    /// Shared deadline for the whole key-value fan-out of one publish
    pub publish_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dirs: vec!["/etc/fleetconf".to_string(), "/var/lib/fleetconf".to_string()],
            prefixes: vec![
                "fleetconf-agent".to_string(),
                "fleetconf-cluster".to_string(),
            ],
            agent_port: DEFAULT_AGENT_PORT,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }
}

/// Live probes, one per status signal
#[derive(Clone)]
pub struct StatusProbes {
    pub used: Arc<dyn StatusProbe>,
    pub synced: Arc<dyn StatusProbe>,
    pub take_effect: Arc<dyn StatusProbe>,
}

impl Default for StatusProbes {
    fn default() -> Self {
        Self {
            used: Arc::new(NoopProbe),
            synced: Arc::new(NoopProbe),
            take_effect: Arc::new(NoopProbe),
        }
    }
}

#[derive(Clone)]
pub struct EngineContext {
    pub db: DatabaseConnection,
    pub settings: EngineSettings,
    pub kv: Arc<dyn KvStore>,
    pub inventory: Arc<dyn FleetInventory>,
    pub resolver: Arc<dyn ResourceResolver>,
    pub proxy: Arc<dyn AgentProxy>,
    pub decryptor: Arc<dyn Decryptor>,
    pub events: Arc<dyn EventSink>,
    pub probes: StatusProbes,
}

impl EngineContext {
    pub fn builder(db: DatabaseConnection) -> EngineContextBuilder {
        EngineContextBuilder::new(db)
    }
}

/// Builder for EngineContext.
///
/// The key-value store, the agent proxy and the decryptor are required.
/// Inventory, resolver and event sink default to the SQL-backed
/// implementations; probes default to `NoopProbe`.
pub struct EngineContextBuilder {
    db: DatabaseConnection,
    settings: EngineSettings,
    kv: Option<Arc<dyn KvStore>>,
    inventory: Option<Arc<dyn FleetInventory>>,
    resolver: Option<Arc<dyn ResourceResolver>>,
    proxy: Option<Arc<dyn AgentProxy>>,
    decryptor: Option<Arc<dyn Decryptor>>,
    events: Option<Arc<dyn EventSink>>,
    probes: StatusProbes,
}

impl EngineContextBuilder {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            settings: EngineSettings::default(),
            kv: None,
            inventory: None,
            resolver: None,
            proxy: None,
            decryptor: None,
            events: None,
            probes: StatusProbes::default(),
        }
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn kv_store(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn FleetInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn agent_proxy(mut self, proxy: Arc<dyn AgentProxy>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn decryptor(mut self, decryptor: Arc<dyn Decryptor>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn probes(mut self, probes: StatusProbes) -> Self {
        self.probes = probes;
        self
    }

    pub fn build(self) -> Result<EngineContext, FleetconfError> {
        let kv = self
            .kv
            .ok_or_else(|| FleetconfError::IllegalArgument("kv store is required".to_string()))?;
        let proxy = self
            .proxy
            .ok_or_else(|| FleetconfError::IllegalArgument("agent proxy is required".to_string()))?;
        let decryptor = self
            .decryptor
            .ok_or_else(|| FleetconfError::IllegalArgument("decryptor is required".to_string()))?;

        if self.settings.dirs.is_empty() {
            return Err(FleetconfError::IllegalArgument(
                "at least one deployment directory is required".to_string(),
            ));
        }

        let db = self.db;
        Ok(EngineContext {
            inventory: self
                .inventory
                .unwrap_or_else(|| Arc::new(SqlFleetInventory::new(db.clone()))),
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(SqlResourceResolver::new(db.clone()))),
            events: self
                .events
                .unwrap_or_else(|| Arc::new(OperationLogSink::new(db.clone()))),
            db,
            settings: self.settings,
            kv,
            proxy,
            decryptor,
            probes: self.probes,
        })
    }
}
