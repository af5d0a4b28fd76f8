//! # Leadflow — lead board and paced WhatsApp campaigns
//!
//! Usage:
//!   leadflow serve                                  # HTTP API (default port from config)
//!   leadflow serve --port 8080                      # Custom port
//!   leadflow campaign --message "Olá!" --category Clínica --dry-run
//!   leadflow init                                   # Write default config, create database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadflow_campaign::{CampaignController, CampaignEvent, build_recipient_set};
use leadflow_channels::{DryRunChannel, WhatsAppChannel};
use leadflow_core::config::LeadflowConfig;
use leadflow_core::traits::{LeadStatusStore, MessageChannel};
use leadflow_core::types::Recipient;
use leadflow_store::LeadDb;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "leadflow",
    version,
    about = "📇 Leadflow — sales-lead board with paced WhatsApp outreach"
)]
struct Cli {
    /// Config file (defaults to $LEADFLOW_CONFIG or ~/.leadflow/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one campaign in the foreground until it completes (Ctrl-C stops it)
    Campaign {
        /// Message text, sent verbatim to every recipient
        #[arg(short, long)]
        message: String,

        /// Only leads in this category (case-insensitive)
        #[arg(long)]
        category: Option<String>,

        /// Restrict to these lead ids (repeatable); defaults to every lead
        #[arg(long = "lead")]
        leads: Vec<i64>,

        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a default config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn config_path(cli: &Cli) -> PathBuf {
    match &cli.config {
        Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
        None => std::env::var("LEADFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| LeadflowConfig::default_path()),
    }
}

fn load_config(path: &Path) -> Result<LeadflowConfig> {
    if path.exists() {
        LeadflowConfig::load_from(path).with_context(|| format!("loading {}", path.display()))
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(LeadflowConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "leadflow=debug,leadflow_campaign=debug,leadflow_store=debug,leadflow_gateway=debug,tower_http=debug"
    } else {
        "leadflow=info,leadflow_campaign=info,leadflow_channels=info,leadflow_gateway=info,leadflow_store=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let path = config_path(&cli);

    match &cli.command {
        Command::Serve { port } => {
            let mut config = load_config(&path)?;
            if let Some(port) = port {
                config.gateway.port = *port;
            }
            leadflow_gateway::start(&config).await
        }
        Command::Campaign {
            message,
            category,
            leads,
            dry_run,
        } => {
            let config = load_config(&path)?;
            run_campaign(&config, message, category.as_deref(), leads, *dry_run).await
        }
        Command::Init { force } => init(&path, *force),
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    println!("📇 Leadflow — Setup\n");

    let config = if path.exists() && !force {
        println!("⚠️  Config already exists at {} (use --force to overwrite)", path.display());
        load_config(path)?
    } else {
        let config = LeadflowConfig::default();
        config.save_to(path)?;
        println!("✅ Config written: {}", path.display());
        config
    };

    let db_path = config.database.resolved_path();
    LeadDb::open(&db_path)?;
    println!("✅ Database ready: {}", db_path.display());

    if !config.whatsapp.is_configured() {
        println!("\nNext: fill in [whatsapp] base_url, instance and api_key in the config.");
    }
    Ok(())
}

async fn run_campaign(
    config: &LeadflowConfig,
    message: &str,
    category: Option<&str>,
    lead_ids: &[i64],
    dry_run: bool,
) -> Result<()> {
    let db = Arc::new(LeadDb::open(&config.database.resolved_path())?);
    let channel: Arc<dyn MessageChannel> = if dry_run {
        Arc::new(DryRunChannel::new())
    } else {
        Arc::new(WhatsAppChannel::new(config.whatsapp.clone())?)
    };

    let all: Vec<Recipient> = db.list_leads_in_order()?.iter().map(Recipient::from).collect();
    let selected: HashSet<i64> = if lead_ids.is_empty() {
        all.iter().map(|r| r.id).collect()
    } else {
        lead_ids.iter().copied().collect()
    };
    let recipients = build_recipient_set(&all, &selected, category);

    let store: Arc<dyn LeadStatusStore> = db;
    let controller = CampaignController::from_config(channel, store, &config.campaign);
    let mut events = controller.subscribe();
    controller.start(message, recipients)?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(CampaignEvent::Completed(summary)) => {
                    println!(
                        "\n🎉 Done: {}/{} sent, {} failed",
                        summary.sent_count,
                        summary.total_recipients,
                        summary.failed_count()
                    );
                    return Ok(());
                }
                Ok(CampaignEvent::SendFailed { lead_id, reason, .. }) => {
                    println!("❌ lead {lead_id}: {reason}");
                }
                Ok(CampaignEvent::Scheduled { position, at, .. }) => {
                    let snap = controller.status();
                    println!(
                        "📤 {}/{} sent — next at {}",
                        snap.sent_count,
                        snap.total_recipients,
                        at.format("%H:%M:%S")
                    );
                    tracing::debug!("Next position: {position}");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::warn!("Missed {n} campaign events"),
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                let snap = controller.status();
                controller.stop();
                println!(
                    "\n⏹️ Stopped: {}/{} sent before interruption",
                    snap.sent_count, snap.total_recipients
                );
                return Ok(());
            }
        }
    }
}
