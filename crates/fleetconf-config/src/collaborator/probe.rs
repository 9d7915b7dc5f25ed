//! Live status probes
//!
//! Each probe asks every node about one signal and reports a per-host
//! outcome. A failed host is reported as an error for that host only.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use fleetconf_persistence::entity::app_node;

use crate::model::UniqZone;

use super::{AgentProxy, AgentResponse, HostCorrections, ProbeContext, ProbeError, ProxyRequest, StatusProbe};

/// Agent endpoint reporting whether a process loaded a config file
pub const QUERY_AGENT_USED_STATUS: &str = "/api/v1/conf/command_line/status";

/// Agent endpoint reporting the version held in the agent's local cache
pub const QUERY_AGENT_SYNC_VERSION: &str = "/api/v1/conf/publish/status";

/// Governance endpoint reporting the config version the process runs with
pub const QUERY_TAKE_EFFECT_VERSION: &str = "/debug/config/version";

/// Probe that never corrects anything; the stored value stands
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProbe;

#[async_trait]
impl StatusProbe for NoopProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> anyhow::Result<HostCorrections> {
        Ok(HostCorrections::new())
    }
}

async fn query_node<T: DeserializeOwned + Default>(
    proxy: &dyn AgentProxy,
    zone: &UniqZone,
    req: ProxyRequest,
) -> Result<T, ProbeError> {
    let body = proxy
        .http_get(zone, &req)
        .await
        .map_err(|e| ProbeError(e.to_string()))?;
    serde_json::from_slice::<AgentResponse<T>>(&body)
        .map_err(|e| ProbeError(format!("malformed response: {}", e)))?
        .into_data()
        .map_err(|e| ProbeError(e.to_string()))
}

async fn probe_nodes<F, Fut>(nodes: &[app_node::Model], f: F) -> HostCorrections
where
    F: Fn(&app_node::Model) -> Fut,
    Fut: Future<Output = Result<i32, ProbeError>>,
{
    let outcomes = join_all(nodes.iter().map(|node| {
        let fut = f(node);
        async move { (node.host_name.clone(), fut.await) }
    }))
    .await;

    outcomes.into_iter().collect()
}

#[derive(Debug, Default, Deserialize)]
struct UsedStatus {
    #[serde(default)]
    used: bool,
}

/// Asks each node's agent whether the process has loaded the file
pub struct AgentUsedProbe {
    proxy: Arc<dyn AgentProxy>,
    agent_port: u16,
}

impl AgentUsedProbe {
    pub fn new(proxy: Arc<dyn AgentProxy>, agent_port: u16) -> Self {
        Self { proxy, agent_port }
    }
}

#[async_trait]
impl StatusProbe for AgentUsedProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<HostCorrections> {
        let corrections = probe_nodes(&ctx.nodes, |node| {
            let req = ProxyRequest::get(
                format!("{}:{}", node.ip, self.agent_port),
                QUERY_AGENT_USED_STATUS,
            )
            .param("app_name", ctx.app.app_name.as_str())
            .param("file_path", ctx.file_path.as_str());
            async move {
                let status: UsedStatus = query_node(self.proxy.as_ref(), &ctx.zone, req).await?;
                Ok(i32::from(status.used))
            }
        })
        .await;

        Ok(corrections)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RunningVersion {
    #[serde(default)]
    version: String,
}

/// Asks each node's agent which version its local cache holds, i.e.
/// whether the published value reached the host
pub struct SyncedProbe {
    proxy: Arc<dyn AgentProxy>,
    agent_port: u16,
}

impl SyncedProbe {
    pub fn new(proxy: Arc<dyn AgentProxy>, agent_port: u16) -> Self {
        Self { proxy, agent_port }
    }
}

#[async_trait]
impl StatusProbe for SyncedProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<HostCorrections> {
        let corrections = probe_nodes(&ctx.nodes, |node| {
            let req = ProxyRequest::get(
                format!("{}:{}", node.ip, self.agent_port),
                QUERY_AGENT_SYNC_VERSION,
            )
            .param("app_name", ctx.app.app_name.as_str())
            .param("env", ctx.zone.env.as_str())
            .param("file_name", ctx.configuration.file_name());
            async move {
                let cached: RunningVersion =
                    query_node(self.proxy.as_ref(), &ctx.zone, req).await?;
                Ok(i32::from(cached.version == ctx.version))
            }
        })
        .await;

        Ok(corrections)
    }
}

/// Asks each node's governance endpoint which config version is live
pub struct TakeEffectProbe {
    proxy: Arc<dyn AgentProxy>,
}

impl TakeEffectProbe {
    pub fn new(proxy: Arc<dyn AgentProxy>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl StatusProbe for TakeEffectProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<HostCorrections> {
        if ctx.app.govern_port.is_empty() {
            anyhow::bail!("app {} has no governance port", ctx.app.app_name);
        }

        let corrections = probe_nodes(&ctx.nodes, |node| {
            let req = ProxyRequest::get(
                format!("{}:{}", node.ip, ctx.app.govern_port),
                QUERY_TAKE_EFFECT_VERSION,
            )
            .param("file_name", ctx.configuration.file_name());
            async move {
                let running: RunningVersion =
                    query_node(self.proxy.as_ref(), &ctx.zone, req).await?;
                Ok(i32::from(running.version == ctx.version))
            }
        })
        .await;

        Ok(corrections)
    }
}
