//! Engine wiring
//!
//! Builds the `EngineContext` from the loaded configuration: one zone proxy
//! client serves as both the key-value store and the agent relay, and backs
//! the three live status probes.

use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use fleetconf_common::{AgentCipher, CryptoError};
use fleetconf_config::collaborator::{
    AgentUsedProbe, Decryptor, ProxyClient, SyncedProbe, TakeEffectProbe,
};
use fleetconf_config::{EngineContext, StatusProbes};

use crate::settings::Configuration;

/// Stands in when no agent secret is configured; every decrypt fails
struct UnconfiguredDecryptor;

impl Decryptor for UnconfiguredDecryptor {
    fn decrypt(&self, _cipher_text: &str) -> Result<String, CryptoError> {
        Err(CryptoError::InvalidKey(
            "agent.secret is not configured".to_string(),
        ))
    }
}

fn decryptor(configuration: &Configuration) -> anyhow::Result<Arc<dyn Decryptor>> {
    let secret = configuration.agent_secret();
    if secret.is_empty() {
        warn!("agent.secret is not configured, instance config reads will fail to decrypt");
        return Ok(Arc::new(UnconfiguredDecryptor));
    }

    let cipher = AgentCipher::from_base64_key(&secret)
        .context("agent.secret must be a base64 encoded 32 byte key")?;
    Ok(Arc::new(cipher))
}

pub fn build_context(
    configuration: &Configuration,
    db: DatabaseConnection,
) -> anyhow::Result<EngineContext> {
    let settings = configuration.engine_settings();
    let routes = configuration.proxy_routes();
    info!(
        dirs = ?settings.dirs,
        prefixes = ?settings.prefixes,
        routes = routes.len(),
        "building engine context"
    );

    let proxy = Arc::new(ProxyClient::new(routes, settings.publish_timeout)?);
    let probes = StatusProbes {
        used: Arc::new(AgentUsedProbe::new(proxy.clone(), settings.agent_port)),
        synced: Arc::new(SyncedProbe::new(proxy.clone(), settings.agent_port)),
        take_effect: Arc::new(TakeEffectProbe::new(proxy.clone())),
    };

    let ctx = EngineContext::builder(db)
        .settings(settings)
        .kv_store(proxy.clone())
        .agent_proxy(proxy)
        .decryptor(decryptor(configuration)?)
        .probes(probes)
        .build()?;

    Ok(ctx)
}
