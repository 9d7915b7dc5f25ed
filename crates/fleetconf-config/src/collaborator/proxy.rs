//! Zone client proxy
//!
//! Every (env, zone) pair is served by a client proxy that owns the
//! connection to that zone's key-value cluster and can relay HTTP calls to
//! hosts inside the zone. `ProxyClient` speaks to those proxies over HTTP.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::UniqZone;

use super::{AgentProxy, KvStore, ProxyRequest};

const KV_PUT_PATH: &str = "/api/v1/proxy/kv/put";
const HTTP_RELAY_PATH: &str = "/api/v1/proxy/http";

/// Address of the proxy serving one zone
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRoute {
    pub env: String,
    pub zone: String,
    /// Base URL, e.g. `http://10.1.0.5:50000`
    pub address: String,
}

#[derive(Serialize)]
struct KvPutRequest<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ProxyReply {
    code: i32,
    #[serde(default)]
    msg: String,
}

/// HTTP client for the zone proxies
#[derive(Clone, Debug)]
pub struct ProxyClient {
    client: reqwest::Client,
    routes: HashMap<UniqZone, String>,
}

impl ProxyClient {
    pub fn new(routes: Vec<ProxyRoute>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build proxy http client")?;

        let routes = routes
            .into_iter()
            .map(|r| {
                (
                    UniqZone::new(r.env, r.zone),
                    r.address.trim_end_matches('/').to_string(),
                )
            })
            .collect();

        Ok(Self { client, routes })
    }

    fn route(&self, zone: &UniqZone) -> anyhow::Result<&str> {
        self.routes
            .get(zone)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("no client proxy configured for zone {}", zone))
    }
}

#[async_trait]
impl KvStore for ProxyClient {
    async fn put(&self, zone: &UniqZone, key: &str, value: &str) -> anyhow::Result<()> {
        let url = format!("{}{}", self.route(zone)?, KV_PUT_PATH);
        debug!(%zone, key, "kv put");

        let reply: ProxyReply = self
            .client
            .post(&url)
            .json(&KvPutRequest { key, value })
            .send()
            .await
            .with_context(|| format!("kv put {} via {}", key, url))?
            .error_for_status()?
            .json()
            .await?;

        if reply.code != 0 && reply.code != 200 {
            anyhow::bail!("kv put {} rejected: {} {}", key, reply.code, reply.msg);
        }
        Ok(())
    }
}

#[async_trait]
impl AgentProxy for ProxyClient {
    async fn http_get(&self, zone: &UniqZone, req: &ProxyRequest) -> anyhow::Result<Vec<u8>> {
        let url = format!("{}{}", self.route(zone)?, HTTP_RELAY_PATH);
        debug!(%zone, address = %req.address, path = %req.url, "proxy http get");

        let body = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .with_context(|| format!("proxy {} to {}", req.url, req.address))?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(body.to_vec())
    }
}
