//! Kiosk server: scan engine, display and control plane in one process.

use anyhow::{Context, Result};
use checkin_cli::{ConfigArgs, EngineService, logging, net, shutdown};
use checkin_engine::{EligibilityPolicy, ScanEngine, ScanPhase};
use checkin_feedback::{Alignment, DisplayMessages, FeedbackDisplay};
use checkin_network::ControlServer;
use checkin_storage::Database;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Exam check-in server
#[derive(Parser, Debug)]
#[command(name = "checkin-server")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: ConfigArgs,

    /// SQLite database file
    #[arg(long)]
    database: Option<String>,

    /// Reject participants who are not registered for the session
    #[arg(long)]
    enforce_eligibility: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.common.log_level.as_deref(), args.common.log_file.as_deref())?;

    let mut config = args.common.load().context("failed to load configuration")?;
    if let Some(database) = args.database {
        config.server.database_path = database;
    }
    if args.enforce_eligibility {
        config.server.eligibility_policy = EligibilityPolicy::Enforce;
    }

    let token = CancellationToken::new();
    shutdown::cancel_on_signal(token.clone())?;

    let database = Database::new(config.database_config())
        .await
        .with_context(|| format!("failed to open database {}", config.server.database_path))?;

    let display = FeedbackDisplay::new(config.feedback_config());
    let engine = ScanEngine::start(
        database.clone(),
        config.status_store(),
        display.clone(),
        config.engine_config(),
    )
    .await
    .context("failed to start scan engine")?;

    info!(
        status_path = %config.status_path.display(),
        policy = %engine.policy(),
        phase = %engine.phase(),
        issuer = config.issuer.enabled,
        "Scan engine ready"
    );

    if engine.phase() == ScanPhase::NoActiveSession {
        let address = net::host_address();
        info!(address = %address, "Host address");
        display
            .show_aligned(DisplayMessages::SYSTEM_READY, &address, Alignment::Center)
            .await;
    }

    let server = ControlServer::bind(config.control_server_config(), EngineService::new(engine))
        .await
        .context("failed to start control plane")?;
    server.serve(token).await.context("control plane failed")?;

    display.clear().await;
    database.close().await;
    info!("Server stopped");
    Ok(())
}
