//! Common test utilities for engine integration tests
//!
//! - An in-memory SQLite database with the full schema
//! - In-memory fakes for the key-value store, the agent proxy and probes
//! - Seed helpers for apps, nodes, configurations and resource values

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

use fleetconf_common::AgentCipher;
use fleetconf_config::collaborator::{
    AgentProxy, EventSink, HostCorrections, KvStore, ProbeContext, ProxyRequest, StatusProbe,
};
use fleetconf_config::{EngineContext, EngineSettings, PublishEvent, StatusProbes, UniqZone};
use fleetconf_persistence::create_tables;
use fleetconf_persistence::entity::{app_info, app_node, config_resource_value, configuration};

pub const TEST_KEY: [u8; 32] = [7u8; 32];
pub const APP_AID: i32 = 1;
pub const APP_NAME: &str = "svc";
pub const GOVERN_PORT: &str = "9090";

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    create_tables(&db).await.expect("create tables");
    db
}

pub fn test_settings() -> EngineSettings {
    EngineSettings {
        dirs: vec!["/a".to_string(), "/b".to_string()],
        prefixes: vec!["p1".to_string(), "p2".to_string()],
        agent_port: 50010,
        publish_timeout: Duration::from_millis(500),
    }
}

/// Records every put; fails from the `fail_at`-th put on when set
#[derive(Default)]
pub struct RecordingKv {
    pub puts: Mutex<Vec<(UniqZone, String, String)>>,
    pub fail_at: Option<usize>,
}

impl RecordingKv {
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, key, _)| key.clone())
            .collect()
    }

    pub fn values(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, value)| value.clone())
            .collect()
    }
}

#[async_trait]
impl KvStore for RecordingKv {
    async fn put(&self, zone: &UniqZone, key: &str, value: &str) -> anyhow::Result<()> {
        let mut puts = self.puts.lock().unwrap();
        if self.fail_at.is_some_and(|n| puts.len() >= n) {
            anyhow::bail!("kv cluster {} unavailable", zone);
        }
        puts.push((zone.clone(), key.to_string(), value.to_string()));
        Ok(())
    }
}

/// Never answers within any sane deadline
pub struct StalledKv;

#[async_trait]
impl KvStore for StalledKv {
    async fn put(&self, _zone: &UniqZone, _key: &str, _value: &str) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Serves canned bodies keyed by `address` + `file_name` param
#[derive(Default)]
pub struct ScriptedProxy {
    pub bodies: HashMap<(String, String), String>,
}

impl ScriptedProxy {
    pub fn with_body(mut self, address: &str, file_name: &str, body: impl Into<String>) -> Self {
        self.bodies
            .insert((address.to_string(), file_name.to_string()), body.into());
        self
    }
}

#[async_trait]
impl AgentProxy for ScriptedProxy {
    async fn http_get(&self, _zone: &UniqZone, req: &ProxyRequest) -> anyhow::Result<Vec<u8>> {
        let file_name = req.params.get("file_name").cloned().unwrap_or_default();
        self.bodies
            .get(&(req.address.clone(), file_name))
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| anyhow::anyhow!("connection refused: {}", req.address))
    }
}

/// Probe returning a fixed outcome
pub struct FixedProbe(pub Result<Vec<(&'static str, i32)>, &'static str>);

#[async_trait]
impl StatusProbe for FixedProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> anyhow::Result<HostCorrections> {
        match &self.0 {
            Ok(values) => Ok(values
                .iter()
                .map(|(host, v)| (host.to_string(), Ok(*v)))
                .collect()),
            Err(msg) => Err(anyhow::anyhow!(*msg)),
        }
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<PublishEvent>>,
    pub fail: bool,
}

#[async_trait]
impl EventSink for RecordingEvents {
    async fn config_publish_event(&self, event: &PublishEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            anyhow::bail!("audit store down");
        }
        Ok(())
    }
}

pub struct Harness {
    pub ctx: EngineContext,
    pub kv: Arc<RecordingKv>,
    pub events: Arc<RecordingEvents>,
}

pub fn harness(db: DatabaseConnection) -> Harness {
    harness_with(db, RecordingKv::default(), ScriptedProxy::default(), StatusProbes::default())
}

pub fn harness_with(
    db: DatabaseConnection,
    kv: RecordingKv,
    proxy: ScriptedProxy,
    probes: StatusProbes,
) -> Harness {
    let kv = Arc::new(kv);
    let events = Arc::new(RecordingEvents::default());
    let ctx = EngineContext::builder(db)
        .settings(test_settings())
        .kv_store(kv.clone())
        .agent_proxy(Arc::new(proxy))
        .decryptor(Arc::new(AgentCipher::new(&TEST_KEY)))
        .event_sink(events.clone())
        .probes(probes)
        .build()
        .expect("build context");

    Harness { ctx, kv, events }
}

pub async fn seed_app(db: &DatabaseConnection) -> app_info::Model {
    app_info::ActiveModel {
        aid: Set(APP_AID),
        app_name: Set(APP_NAME.to_string()),
        govern_port: Set(GOVERN_PORT.to_string()),
    }
    .insert(db)
    .await
    .expect("seed app")
}

pub async fn seed_node(
    db: &DatabaseConnection,
    host_name: &str,
    ip: &str,
    env: &str,
    zone_code: &str,
) -> app_node::Model {
    app_node::ActiveModel {
        aid: Set(APP_AID),
        app_name: Set(APP_NAME.to_string()),
        host_name: Set(host_name.to_string()),
        ip: Set(ip.to_string()),
        device_id: Set(0),
        env: Set(env.to_string()),
        region_code: Set("cn".to_string()),
        region_name: Set("China".to_string()),
        zone_code: Set(zone_code.to_string()),
        zone_name: Set(zone_code.to_uppercase()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed node")
}

pub async fn seed_config(
    db: &DatabaseConnection,
    name: &str,
    format: &str,
    env: &str,
    zone: &str,
) -> configuration::Model {
    let now = chrono::Local::now().naive_local();
    configuration::ActiveModel {
        aid: Set(APP_AID),
        name: Set(name.to_string()),
        content: Set(String::new()),
        format: Set(format.to_string()),
        env: Set(env.to_string()),
        zone: Set(zone.to_string()),
        version: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
        published_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed configuration")
}

pub async fn seed_resource_value(
    db: &DatabaseConnection,
    name: &str,
    value: &str,
) -> config_resource_value::Model {
    config_resource_value::ActiveModel {
        config_resource_id: Set(1),
        name: Set(name.to_string()),
        value: Set(value.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed resource value")
}

/// App with two dev/wh nodes and one toml configuration
pub async fn seed_fleet(db: &DatabaseConnection) -> configuration::Model {
    seed_app(db).await;
    seed_node(db, "h1", "10.0.0.1", "dev", "wh").await;
    seed_node(db, "h2", "10.0.0.2", "dev", "wh").await;
    seed_config(db, "app", "toml", "dev", "wh").await
}
