//! Configuration management for the Fleetconf server
//!
//! Settings come from `conf/application.yml` (or `--config`), then
//! `FLEETCONF_`-prefixed environment variables, then command line overrides.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Deserialize;

use fleetconf_config::EngineSettings;
use fleetconf_config::collaborator::ProxyRoute;
use fleetconf_config::context::{DEFAULT_AGENT_PORT, DEFAULT_PUBLISH_TIMEOUT};

use crate::startup::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

const DEFAULT_DIRS: [&str; 2] = ["/etc/fleetconf", "/var/lib/fleetconf"];
const DEFAULT_PREFIXES: [&str; 2] = ["fleetconf-agent", "fleetconf-cluster"];

#[derive(Debug, Deserialize)]
struct RouteEntry {
    env: String,
    zone: String,
    address: String,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load the configuration file, the environment and the overrides.
    /// A missing default file is tolerated; an explicit one is required.
    pub fn load(path: Option<&str>, database_url: Option<String>) -> Result<Self, ConfigError> {
        let source = match path {
            Some(p) => File::with_name(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut builder = Config::builder().add_source(source).add_source(
            Environment::with_prefix("fleetconf")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("configure.dirs")
                .with_list_parse_key("configure.prefixes")
                .try_parsing(true),
        );

        if let Some(url) = database_url {
            builder = builder.set_override("db.url", url)?;
        }

        Ok(Self {
            config: builder.build()?,
        })
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // ========================================================================
    // Engine
    // ========================================================================

    pub fn configure_dirs(&self) -> Vec<String> {
        self.config
            .get::<Vec<String>>("configure.dirs")
            .unwrap_or_else(|_| DEFAULT_DIRS.iter().map(|d| d.to_string()).collect())
    }

    pub fn configure_prefixes(&self) -> Vec<String> {
        self.config
            .get::<Vec<String>>("configure.prefixes")
            .unwrap_or_else(|_| DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect())
    }

    pub fn agent_port(&self) -> u16 {
        self.config
            .get_int("agent.port")
            .ok()
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_AGENT_PORT)
    }

    pub fn agent_secret(&self) -> String {
        self.config.get_string("agent.secret").unwrap_or_default()
    }

    pub fn publish_timeout(&self) -> Duration {
        self.config
            .get_int("publish.timeout_secs")
            .ok()
            .and_then(|s| u64::try_from(s).ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PUBLISH_TIMEOUT)
    }

    pub fn proxy_routes(&self) -> Vec<ProxyRoute> {
        self.config
            .get::<Vec<RouteEntry>>("proxy.routes")
            .unwrap_or_default()
            .into_iter()
            .map(|r| ProxyRoute {
                env: r.env,
                zone: r.zone,
                address: r.address,
            })
            .collect()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            dirs: self.configure_dirs(),
            prefixes: self.configure_prefixes(),
            agent_port: self.agent_port(),
            publish_timeout: self.publish_timeout(),
        }
    }

    // ========================================================================
    // Logging
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("logging.dir").ok().map(PathBuf::from),
            self.config.get_bool("logging.console").unwrap_or(true),
            self.config.get_bool("logging.file").unwrap_or(false),
            self.config
                .get_string("logging.level")
                .unwrap_or_else(|_| "info".to_string()),
        )
    }

    // ========================================================================
    // Database
    // ========================================================================

    pub fn database_url(&self) -> Option<String> {
        self.config.get_string("db.url").ok()
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let url = self
            .database_url()
            .ok_or_else(|| anyhow::anyhow!("db.url is not configured"))?;

        let max_connections = self
            .config
            .get_int("db.pool.max_connections")
            .unwrap_or(20) as u32;
        let min_connections = self
            .config
            .get_int("db.pool.min_connections")
            .unwrap_or(1) as u32;
        let connect_timeout = self
            .config
            .get_int("db.pool.connect_timeout")
            .unwrap_or(30) as u64;
        let acquire_timeout = self
            .config
            .get_int("db.pool.acquire_timeout")
            .unwrap_or(8) as u64;
        let idle_timeout = self.config.get_int("db.pool.idle_timeout").unwrap_or(10) as u64;
        let max_lifetime = self
            .config
            .get_int("db.pool.max_lifetime")
            .unwrap_or(1800) as u64;
        let sqlx_logging = self
            .config
            .get_bool("db.pool.sqlx_logging")
            .unwrap_or(false);

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .sqlx_logging(sqlx_logging);

        tracing::info!(
            max_connections,
            min_connections,
            connect_timeout,
            idle_timeout,
            max_lifetime,
            sqlx_logging,
            "database pool configured"
        );

        Ok(Database::connect(opt).await?)
    }
}
