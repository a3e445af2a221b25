//! Command-line interface and the sync-then-process pipeline

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::actions::ActionApplier;
use crate::auth;
use crate::client::ProductionGmailClient;
use crate::config::Config;
use crate::engine::{RuleEngine, SystemClock};
use crate::error::{GmailError, Result};
use crate::report::RunReport;
use crate::rules::Ruleset;
use crate::store::MessageStore;
use crate::sync::Synchronizer;

#[derive(Parser, Debug)]
#[command(name = "gmail-rules")]
#[command(version)]
#[command(about = "Apply declarative rules to Gmail messages", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-rules/token.json")]
    pub token_cache: PathBuf,

    /// Ruleset document (overrides rules.path from the config)
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Evaluate rules and log actions without changing the mailbox
    #[arg(long)]
    pub dry_run: bool,

    /// Process the messages already in the local store
    #[arg(long)]
    pub skip_sync: bool,

    /// Write the Markdown run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write an example configuration to --config and exit
    #[arg(long)]
    pub init_config: bool,

    /// Overwrite an existing file with --init-config
    #[arg(long, requires = "init_config")]
    pub force: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.rules {
            config.rules.path = path.clone();
        }
        if self.dry_run {
            config.execution.dry_run = true;
        }
    }
}

/// Write the default configuration to `path`, refusing to clobber an
/// existing file unless `force` is set.
pub async fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(GmailError::ConfigError(format!(
            "Configuration file already exists at {:?}. Use --force to overwrite.",
            path
        )));
    }

    Config::create_example(path).await?;
    info!("Created example configuration file at {:?}", path);
    Ok(())
}

#[cfg(feature = "cache")]
fn open_store(config: &Config) -> Result<Box<dyn MessageStore>> {
    Ok(Box::new(crate::store::SqliteStore::open(&config.store.path)?))
}

#[cfg(not(feature = "cache"))]
fn open_store(_config: &Config) -> Result<Box<dyn MessageStore>> {
    tracing::warn!("Built without the cache feature; messages are kept in memory only");
    Ok(Box::new(crate::store::MemoryStore::new()))
}

/// Load the ruleset, sync the mailbox, then evaluate every stored message.
///
/// The ruleset is loaded first so a bad document aborts before any network
/// traffic.
pub async fn run_pipeline(cli: &Cli, config: &Config) -> Result<RunReport> {
    let ruleset = Arc::new(Ruleset::load(&config.rules.path).await?);

    info!("Authenticating with Gmail API...");
    if let Some(parent) = cli.token_cache.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
    if cli.token_cache.exists() {
        auth::secure_token_file(&cli.token_cache).await?;
    }

    let client = Arc::new(ProductionGmailClient::new(
        hub,
        config.sync.max_concurrent_requests,
    ));
    let store = open_store(config)?;

    if cli.skip_sync {
        info!("Skipping sync; {} messages in store", store.len().await?);
    } else {
        let report = Synchronizer::new(client.clone(), &config.sync)
            .sync(store.as_ref())
            .await?;
        info!(
            "Sync finished: {} stored, {} failed",
            report.stored,
            report.failed_message_ids.len()
        );
    }

    let applier = ActionApplier::new(client, config.execution.action_timeout())
        .with_dry_run(config.execution.dry_run)
        .with_create_missing_labels(config.labels.create_missing);
    let engine = RuleEngine::new(applier, Arc::new(SystemClock))
        .with_policy(config.rules.action_policy);

    engine
        .process_store(
            store.as_ref(),
            ruleset,
            config.execution.max_concurrent_messages,
        )
        .await
}
