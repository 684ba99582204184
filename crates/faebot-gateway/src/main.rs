use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use faebot_agent::{Bot, ModelRoster, ReplicateProvider};
use faebot_audit::AuditLog;
use faebot_channels::{listen_with_backoff, BackoffPolicy, ChatChannel, InboundMessage};
use faebot_core::FaebotConfig;
use faebot_twitch::TwitchChannel;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Inbound messages buffered between the transport and the ingestion loop.
const INBOUND_BUFFER: usize = 256;

/// Twitch chat bot that joins in with text generated on Replicate.
#[derive(Debug, Parser)]
#[command(
    name = "faebot",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("FAEBOT_GIT_SHA"), ")"),
    about
)]
struct Args {
    /// Config file. Defaults to $FAEBOT_CONFIG, then ~/.faebot/faebot.toml.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "faebot_gateway=info,faebot_agent=info,faebot_twitch=info,faebot_channels=info"
                    .into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > FAEBOT_CONFIG env > ~/.faebot/faebot.toml
    let config_path = args.config.or_else(|| std::env::var("FAEBOT_CONFIG").ok());
    let config = FaebotConfig::load(config_path.as_deref()).context("loading config")?;
    if config.bot.admins.is_empty() {
        warn!("no admins configured; `model` and `join` commands are unusable");
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path).context("creating database directory")?;
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let audit = Arc::new(AuditLog::new(db)?);

    let provider =
        Arc::new(ReplicateProvider::new(&config.replicate).context("building Replicate client")?);
    let twitch = Arc::new(TwitchChannel::from_config(&config).context("building Twitch client")?);
    let roster = ModelRoster::new(config.models.clone())?;

    let bot = Bot::new(
        config.bot.clone(),
        roster,
        provider,
        twitch.clone(),
        audit,
    )
    .with_max_new_tokens(config.replicate.max_new_tokens)
    .with_channels(twitch.channels().await);
    let bot = Arc::new(bot);

    let (tx, rx) = mpsc::channel::<InboundMessage>(INBOUND_BUFFER);
    let transport: Arc<dyn ChatChannel> = twitch;
    let listener = tokio::spawn(listen_with_backoff(transport, tx, BackoffPolicy::default()));
    let ingest = tokio::spawn(Arc::clone(&bot).run(rx));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("FAEBOT_GIT_SHA"),
        nick = %config.nick(),
        channels = ?bot.joined_channels().await,
        models = ?config.models,
        "faebot running"
    );

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            Ok(())
        }
        joined = listener => match joined {
            Ok(Ok(())) => {
                info!("chat transport stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "chat transport gave up");
                Err(e.into())
            }
            Err(e) => Err(anyhow::anyhow!("chat transport task failed: {e}")),
        },
    };

    ingest.abort();
    result
}

fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
