//! Command line surface
//!
//! Every subcommand maps onto one engine operation and prints its result as
//! JSON on stdout.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use fleetconf_common::FleetconfError;
use fleetconf_config::service::{config, fetch, history, ledger, publish, status};
use fleetconf_config::{Author, CreateConfigForm, EngineContext};

#[derive(Debug, Parser)]
#[command(name = "fleetconf-server", about = "Configuration publish and reconciliation")]
pub struct Cli {
    /// Configuration file, defaults to conf/application.yml
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    #[arg(long = "db-url", env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Author of a saved version: a user id or an access token id
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct AuthorArgs {
    #[arg(long)]
    pub uid: Option<i32>,

    #[arg(long = "token-id")]
    pub token_id: Option<i32>,
}

impl AuthorArgs {
    fn author(&self) -> Result<Author, FleetconfError> {
        match (self.uid, self.token_id) {
            (Some(uid), None) => Ok(Author::User(uid)),
            (None, Some(id)) => Ok(Author::AccessToken(id)),
            _ => Err(FleetconfError::IllegalArgument(
                "exactly one of --uid or --token-id is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create every table and index
    InitSchema,

    /// Save new content as the next version of a configuration
    Save {
        config_id: i32,
        /// File holding the new content
        #[arg(long)]
        file: PathBuf,
        #[arg(long = "change-log", default_value = "")]
        change_log: String,
        #[command(flatten)]
        author: AuthorArgs,
    },

    /// Publish a history entry, by id or by version
    Publish {
        config_id: i32,
        #[arg(long = "history-id", conflicts_with = "version", required_unless_present = "version")]
        history_id: Option<i32>,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        uid: i32,
    },

    /// Page through the history of a configuration
    History {
        config_id: i32,
        #[arg(long, default_value_t = 0)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        size: u64,
    },

    /// Compare a history entry with its predecessor
    Diff { config_id: i32, history_id: i32 },

    /// Status of every instance in a zone
    Instances {
        config_id: i32,
        #[arg(long)]
        env: String,
        #[arg(long)]
        zone: String,
    },

    /// Read the deployed files of a configuration from one host
    Read {
        config_id: i32,
        #[arg(long)]
        host: String,
    },

    /// Configurations of an application in an env
    List {
        #[arg(long)]
        app: String,
        #[arg(long)]
        env: String,
    },

    /// One configuration with its content
    Detail { id: i32 },

    /// Create an empty configuration
    Create {
        #[arg(long)]
        app: String,
        #[arg(long)]
        env: String,
        #[arg(long)]
        zone: String,
        /// File name without the format suffix
        #[arg(long)]
        name: String,
        #[arg(long)]
        format: String,
    },

    /// Delete a configuration
    Delete { id: i32 },

    /// Every configuration with its content
    Dump,
}

fn to_json<T: Serialize>(value: T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Run one engine command
pub async fn run(ctx: &EngineContext, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::InitSchema => {
            fleetconf_persistence::create_tables(&ctx.db).await?;
            to_json(serde_json::json!({ "schema": "ready" }))
        }
        Command::Save {
            config_id,
            file,
            change_log,
            author,
        } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let history_id =
                ledger::save_new_version(ctx, config_id, &content, author.author()?, &change_log)
                    .await?;
            to_json(serde_json::json!({ "historyId": history_id }))
        }
        Command::Publish {
            config_id,
            history_id,
            version,
            uid,
        } => {
            let receipt = match (history_id, version) {
                (Some(history_id), _) => publish::publish(ctx, config_id, history_id, uid).await?,
                (None, Some(version)) => {
                    publish::publish_version(ctx, config_id, &version, uid).await?
                }
                (None, None) => {
                    return Err(FleetconfError::IllegalArgument(
                        "--history-id or --version is required".to_string(),
                    )
                    .into());
                }
            };
            to_json(receipt)
        }
        Command::History {
            config_id,
            page,
            size,
        } => to_json(history::history_page(&ctx.db, config_id, page, size).await?),
        Command::Diff {
            config_id,
            history_id,
        } => to_json(history::diff(&ctx.db, config_id, history_id).await?),
        Command::Instances {
            config_id,
            env,
            zone,
        } => to_json(status::list_instance_status(ctx, config_id, &env, &zone).await?),
        Command::Read { config_id, host } => {
            to_json(fetch::read_instance_config(ctx, config_id, &host).await?)
        }
        Command::List { app, env } => to_json(config::list(ctx, &app, &env).await?),
        Command::Detail { id } => to_json(config::detail(&ctx.db, id).await?),
        Command::Create {
            app,
            env,
            zone,
            name,
            format,
        } => {
            let form = CreateConfigForm {
                app_name: app,
                env,
                zone,
                file_name: name,
                format,
            };
            to_json(config::create(ctx, &form).await?)
        }
        Command::Delete { id } => {
            let deleted = config::delete(&ctx.db, id).await?;
            to_json(serde_json::json!({ "deleted": deleted }))
        }
        Command::Dump => to_json(config::get_all_config_text(&ctx.db).await?),
    }
}
