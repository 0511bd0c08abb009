//! Kiosk configuration.
//!
//! Both binaries read the same TOML file so they agree on shared settings
//! such as `status_path`. Every key is optional:
//!
//! ```toml
//! status_path = "scan_status.json"
//! development_mode = false
//!
//! [server]
//! bind_addr = "127.0.0.1:5000"
//! database_path = "checkin.db"
//! eligibility_policy = "advisory"   # or "enforce"
//!
//! [display]
//! backend = "console"               # console | virtual | i2c
//! i2c_bus = 1
//! i2c_address = 0x27
//! columns = 16
//! rows = 2
//! idle_message = "System Ready"
//! scroll_step_ms = 350
//!
//! [scanner]
//! device_path = "/dev/input/by-id/usb-Scanner-event-kbd"
//! backend = "evdev"                 # evdev | mock
//!
//! [issuer]
//! enabled = false
//! output_dir = "output_barcodes"
//! code_prefix = "BK"
//! print_command = "lp"
//! printer = "Office"
//! copies = 1
//! ```
//!
//! Command-line flags ([`ConfigArgs`]) are applied on top of the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use checkin_core::constants::{
    DEFAULT_CONTROL_ADDR, DEFAULT_DATABASE_PATH, DEFAULT_DISPLAY_COLUMNS, DEFAULT_DISPLAY_ROWS,
    DEFAULT_I2C_ADDRESS, DEFAULT_I2C_BUS, DEFAULT_IDLE_MESSAGE, DEFAULT_SCROLL_STEP_MS,
    DEFAULT_STATUS_PATH, DEFAULT_SUBMIT_TIMEOUT_MS,
};
use checkin_core::StatusStore;
use checkin_engine::{EligibilityPolicy, EngineConfig, IssuerConfig};
use checkin_feedback::FeedbackConfig;
use checkin_hardware::DisplayTarget;
use checkin_network::{ControlClientConfig, ControlServerConfig};
use checkin_storage::DatabaseConfig;
use clap::Args;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_PATH: &str = "checkin.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Status Store file shared by the listener and the server.
    pub status_path: PathBuf,

    /// Serve non-loopback control-plane peers.
    pub development_mode: bool,

    pub server: ServerSection,
    pub display: DisplaySection,
    pub scanner: ScannerSection,
    pub issuer: IssuerSection,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            status_path: PathBuf::from(DEFAULT_STATUS_PATH),
            development_mode: false,
            server: ServerSection::default(),
            display: DisplaySection::default(),
            scanner: ScannerSection::default(),
            issuer: IssuerSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub eligibility_policy: EligibilityPolicy,
    /// Listener round-trip timeout in milliseconds.
    pub submit_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_control_addr(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            eligibility_policy: EligibilityPolicy::default(),
            submit_timeout_ms: DEFAULT_SUBMIT_TIMEOUT_MS,
        }
    }
}

fn default_control_addr() -> SocketAddr {
    DEFAULT_CONTROL_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 5000)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    /// Log lines only.
    #[default]
    Console,
    /// In-memory panel, for development without hardware.
    Virtual,
    /// HD44780 LCD behind an I2C backpack.
    I2c,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub backend: DisplayBackend,
    pub i2c_bus: u8,
    pub i2c_address: u16,
    pub columns: usize,
    pub rows: usize,
    pub idle_message: String,
    pub scroll_step_ms: u64,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            backend: DisplayBackend::default(),
            i2c_bus: DEFAULT_I2C_BUS,
            i2c_address: DEFAULT_I2C_ADDRESS,
            columns: DEFAULT_DISPLAY_COLUMNS,
            rows: DEFAULT_DISPLAY_ROWS,
            idle_message: DEFAULT_IDLE_MESSAGE.to_string(),
            scroll_step_ms: DEFAULT_SCROLL_STEP_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerBackend {
    /// Linux input device, claimed exclusively.
    #[default]
    Evdev,
    /// Codes typed on standard input.
    Mock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// Skip discovery and open this device.
    pub device_path: Option<String>,
    pub backend: ScannerBackend,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerSection {
    /// Mint and print a booklet for every verified participant.
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: IssuerConfig,
}

impl KioskConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// read if present and defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.columns == 0 || self.display.rows == 0 {
            return Err(ConfigError::Validation(
                "display columns and rows must be non-zero".to_string(),
            ));
        }
        if self.display.scroll_step_ms == 0 {
            return Err(ConfigError::Validation(
                "display.scroll_step_ms must be non-zero".to_string(),
            ));
        }
        if self.issuer.settings.copies == 0 {
            return Err(ConfigError::Validation(
                "issuer.copies must be at least 1".to_string(),
            ));
        }
        if self.issuer.enabled && self.issuer.settings.print_command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "issuer.print_command must be set when the issuer is enabled".to_string(),
            ));
        }
        if self.server.submit_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "server.submit_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn status_store(&self) -> StatusStore {
        StatusStore::new(&self.status_path)
    }

    pub fn display_target(&self) -> DisplayTarget {
        let display = &self.display;
        match display.backend {
            DisplayBackend::Console => DisplayTarget::Console,
            DisplayBackend::Virtual => DisplayTarget::Virtual(
                checkin_hardware::mock::VirtualPanel::new(display.columns, display.rows),
            ),
            DisplayBackend::I2c => DisplayTarget::I2c {
                bus: display.i2c_bus,
                address: display.i2c_address,
                columns: display.columns,
                rows: display.rows,
            },
        }
    }

    pub fn feedback_config(&self) -> FeedbackConfig {
        FeedbackConfig::new(self.display_target())
            .with_columns(self.display.columns)
            .with_idle_message(self.display.idle_message.clone())
            .with_scroll_step(Duration::from_millis(self.display.scroll_step_ms))
    }

    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default().with_policy(self.server.eligibility_policy);
        if self.issuer.enabled {
            config.with_issuer(self.issuer.settings.clone())
        } else {
            config
        }
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.server.database_path.clone())
    }

    pub fn control_server_config(&self) -> ControlServerConfig {
        ControlServerConfig::new(self.server.bind_addr).development_mode(self.development_mode)
    }

    /// Client settings for reaching the server. A wildcard bind address is
    /// reached through loopback.
    pub fn control_client_config(&self) -> ControlClientConfig {
        let mut addr = self.server.bind_addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(std::net::Ipv4Addr::LOCALHOST.into());
        }
        ControlClientConfig::new(addr)
            .with_timeout(Duration::from_millis(self.server.submit_timeout_ms))
    }
}

/// Flags shared by every binary. Each one overrides the matching file key.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CHECKIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Status Store file shared with the other kiosk process
    #[arg(long)]
    pub status_path: Option<PathBuf>,

    /// Control-plane address
    #[arg(long)]
    pub bind_addr: Option<SocketAddr>,

    /// Accept control-plane connections from other hosts
    #[arg(long)]
    pub development_mode: bool,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive).
    /// Falls back to RUST_LOG, then info.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load the file named by `--config` (or the default) and apply the flags.
    pub fn load(&self) -> Result<KioskConfig, ConfigError> {
        let mut config = KioskConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut KioskConfig) {
        if let Some(path) = &self.status_path {
            config.status_path = path.clone();
        }
        if let Some(addr) = self.bind_addr {
            config.server.bind_addr = addr;
        }
        if self.development_mode {
            config.development_mode = true;
        }
    }
}
