//! Kiosk listener: reads the barcode scanner and forwards codes to the server.

use anyhow::{Context, Result};
use checkin_cli::config::ScannerBackend;
use checkin_cli::{ConfigArgs, logging, shutdown};
use checkin_hardware::AnyScannerDevice;
use checkin_hardware::mock::{MockScanner, MockScannerHandle};
use checkin_listener::ScanListener;
use checkin_network::ControlClient;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exam check-in scanner listener
#[derive(Parser, Debug)]
#[command(name = "checkin-listener")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: ConfigArgs,

    /// Scanner input device; skips discovery
    #[arg(long)]
    device: Option<String>,

    /// Read codes from stdin, one per line, instead of a scanner
    #[arg(long)]
    mock_scanner: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.common.log_level.as_deref(), args.common.log_file.as_deref())?;

    let mut config = args.common.load().context("failed to load configuration")?;
    if let Some(device) = args.device {
        config.scanner.device_path = Some(device);
    }
    if args.mock_scanner {
        config.scanner.backend = ScannerBackend::Mock;
    }

    let token = CancellationToken::new();
    shutdown::cancel_on_signal(token.clone())?;

    let scanner = match config.scanner.backend {
        ScannerBackend::Evdev => AnyScannerDevice::open(config.scanner.device_path.as_deref())
            .context("failed to open scanner")?,
        ScannerBackend::Mock => {
            let (scanner, handle) = MockScanner::with_name("stdin");
            tokio::spawn(type_stdin(handle, token.clone()));
            info!("Reading codes from stdin");
            AnyScannerDevice::Mock(scanner)
        }
    };

    let client = ControlClient::new(config.control_client_config());
    info!(server = %client.server_addr(), "Forwarding scans");

    let stats = ScanListener::new(scanner, client, config.status_store())
        .run(token)
        .await
        .context("scanner listener failed")?;

    info!(codes = stats.codes, accepted = stats.accepted, "Listener exited");
    Ok(())
}

/// Feed stdin lines to the mock scanner; end of input stops the listener.
async fn type_stdin(handle: MockScannerHandle, token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = token.cancelled() => return,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                if let Err(e) = handle.type_code(line.trim()).await {
                    warn!(line = %line, error = %e, "Cannot type code");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
    token.cancel();
}
