//! Artifact (booklet) issuing.
//!
//! When enabled, a verified participant gets a freshly minted booklet code.
//! The issuer renders an A4 SVG sheet into the output directory, carrying
//! the participant, the session and the code as a Code 128 barcode that the
//! kiosk scanner reads back at the artifact step, and hands it to the print
//! spooler:
//!
//! ```text
//! {print_command} [-d {printer}] [-n {copies}] {sheet}
//! ```
//!
//! `-n` is only passed for more than one copy.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use barcoders::sym::code128::Code128;
use chrono::{Local, Utc};
use checkin_core::constants::{DEFAULT_ARTIFACT_DIR, DEFAULT_ARTIFACT_PREFIX, DEFAULT_PRINT_COMMAND};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Failed to write artifact sheet {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode '{code}' as a barcode: {message}")]
    Barcode { code: String, message: String },

    #[error("Failed to run print command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Print command '{command}' exited with {status}: {stderr}")]
    PrintFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Issuer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    pub output_dir: PathBuf,
    pub code_prefix: String,
    pub print_command: String,
    /// Named printer; the spooler default when unset.
    pub printer: Option<String>,
    pub copies: u32,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            code_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            print_command: DEFAULT_PRINT_COMMAND.to_string(),
            printer: None,
            copies: 1,
        }
    }
}

impl IssuerConfig {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_print_command(mut self, command: impl Into<String>) -> Self {
        self.print_command = command.into();
        self
    }

    pub fn with_printer(mut self, printer: impl Into<String>) -> Self {
        self.printer = Some(printer.into());
        self
    }

    pub fn with_copies(mut self, copies: u32) -> Self {
        self.copies = copies;
        self
    }
}

/// A booklet that was minted, written and sent to the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedArtifact {
    pub code: String,
    pub sheet: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ArtifactIssuer {
    config: IssuerConfig,
}

impl ArtifactIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Mint, write and print a booklet for `participant` in `session`.
    ///
    /// # Errors
    ///
    /// Returns an [`IssueError`] if the sheet cannot be written, the print
    /// command cannot be started, or it exits unsuccessfully.
    pub async fn issue(&self, participant: &str, session: &str) -> Result<IssuedArtifact, IssueError> {
        let unique_id = mint_unique_id();
        let code = format!("{}{}", self.config.code_prefix, unique_id);
        let sheet = self.sheet_path(&unique_id);

        self.write_sheet(&sheet, &code, participant, session).await?;
        self.print(&sheet).await?;

        info!(code = %code, sheet = %sheet.display(), participant, session, "Artifact issued");
        Ok(IssuedArtifact { code, sheet })
    }

    fn sheet_path(&self, unique_id: &str) -> PathBuf {
        let safe: String = unique_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.config
            .output_dir
            .join(format!("Booklet_{}_{}.svg", self.config.code_prefix, safe))
    }

    async fn write_sheet(
        &self,
        path: &Path,
        code: &str,
        participant: &str,
        session: &str,
    ) -> Result<(), IssueError> {
        let write_err = |source| IssueError::Write {
            path: path.display().to_string(),
            source,
        };

        let modules = barcode_modules(code)?;
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let sheet = render_sheet(&modules, code, participant, session, &generated);

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(write_err)?;
        tokio::fs::write(path, sheet).await.map_err(write_err)
    }

    async fn print(&self, sheet: &Path) -> Result<(), IssueError> {
        let mut command = Command::new(&self.config.print_command);
        if let Some(printer) = &self.config.printer {
            command.arg("-d").arg(printer);
        }
        if self.config.copies > 1 {
            command.arg("-n").arg(self.config.copies.to_string());
        }
        command
            .arg(sheet)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = %self.config.print_command, sheet = %sheet.display(), "Issuing print command");

        let output = command.output().await.map_err(|source| IssueError::Spawn {
            command: self.config.print_command.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(command = %self.config.print_command, status = %output.status, stderr = %stderr, "Print command failed");
            return Err(IssueError::PrintFailed {
                command: self.config.print_command.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(())
    }
}

/// Code 128 character set B selector understood by `barcoders`.
const CODE128_SET_B: char = '\u{181}';

// Page geometry in points (A4).
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const BARCODE_X: f32 = 150.0;
const BARCODE_TOP: f32 = 112.0;
const BARCODE_HEIGHT: f32 = 30.0;
const MODULE_WIDTH: f32 = 0.8;

/// Bar/space modules of `code`, one byte per module (1 = bar).
fn barcode_modules(code: &str) -> Result<Vec<u8>, IssueError> {
    Code128::new(format!("{CODE128_SET_B}{code}"))
        .map(|symbol| symbol.encode())
        .map_err(|e| IssueError::Barcode {
            code: code.to_string(),
            message: e.to_string(),
        })
}

/// One printable page: title, participant, session, barcode and the code in
/// clear text under it.
fn render_sheet(
    modules: &[u8],
    code: &str,
    participant: &str,
    session: &str,
    generated: &str,
) -> String {
    let mut bars = String::new();
    let mut x = BARCODE_X;
    for run in modules.chunk_by(|a, b| a == b) {
        let width = run.len() as f32 * MODULE_WIDTH;
        if run[0] == 1 {
            bars.push_str(&format!(
                "  <rect x=\"{x:.1}\" y=\"{BARCODE_TOP}\" width=\"{width:.1}\" height=\"{BARCODE_HEIGHT}\"/>\n"
            ));
        }
        x += width;
    }
    let barcode_center = BARCODE_X + modules.len() as f32 * MODULE_WIDTH / 2.0;

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{PAGE_WIDTH}pt" height="{PAGE_HEIGHT}pt" viewBox="0 0 {PAGE_WIDTH} {PAGE_HEIGHT}" font-family="Helvetica, Arial, sans-serif">
  <rect width="100%" height="100%" fill="white"/>
  <text x="{title_x}" y="70" font-size="18" font-weight="bold" text-anchor="middle">Exam Booklet</text>
  <text x="{BARCODE_X}" y="{student_y}" font-size="12">Student: {participant}</text>
  <text x="{BARCODE_X}" y="{exam_y}" font-size="12">Exam: {session}</text>
  <g fill="black">
{bars}  </g>
  <text x="{barcode_center:.1}" y="{code_y}" font-size="10" text-anchor="middle">{code}</text>
  <text x="{title_x}" y="{footer_y}" font-size="8" font-style="italic" text-anchor="middle">Generated: {generated}</text>
</svg>
"#,
        title_x = PAGE_WIDTH / 2.0,
        student_y = BARCODE_TOP - 25.0,
        exam_y = BARCODE_TOP - 10.0,
        code_y = BARCODE_TOP + BARCODE_HEIGHT + 15.0,
        footer_y = PAGE_HEIGHT - 30.0,
        participant = xml_escape(participant),
        session = xml_escape(session),
        code = xml_escape(code),
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `YYYYMMDDHHMMSS` followed by four hex digits of a random UUID.
fn mint_unique_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..4]).to_uppercase()
}
