//! Session control from the shell.
//!
//! ```text
//! checkin-ctl activate 3
//! checkin-ctl submit S100 identity 3
//! checkin-ctl status
//! checkin-ctl deactivate 3
//! ```

use anyhow::{Context, Result, bail};
use checkin_cli::{ConfigArgs, logging};
use checkin_core::{CodeKind, SessionId, Submission};
use checkin_network::{ControlClient, ControlRequest};
use clap::{Parser, Subcommand};

/// Exam check-in control client
#[derive(Parser, Debug)]
#[command(name = "checkin-ctl")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Arm a session for check-ins
    Activate { session_id: SessionId },
    /// Close a session
    Deactivate { session_id: SessionId },
    /// Show the current scan status
    Status,
    /// Submit a code by hand, as if it had been scanned
    Submit {
        code: String,
        /// identity or artifact
        kind: CodeKind,
        session_id: SessionId,
    },
}

impl Command {
    fn into_request(self) -> ControlRequest {
        match self {
            Command::Activate { session_id } => ControlRequest::Activate { session_id },
            Command::Deactivate { session_id } => ControlRequest::Deactivate { session_id },
            Command::Status => ControlRequest::Status,
            Command::Submit {
                code,
                kind,
                session_id,
            } => ControlRequest::Submit(Submission::new(code, kind, session_id)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(
        Some(args.common.log_level.as_deref().unwrap_or("warn")),
        args.common.log_file.as_deref(),
    )?;

    let config = args.common.load().context("failed to load configuration")?;
    let client = ControlClient::new(config.control_client_config());

    let response = client
        .request(&args.command.into_request())
        .await
        .with_context(|| format!("control plane at {} unavailable", client.server_addr()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.success {
        bail!("{}", response.message);
    }
    Ok(())
}
