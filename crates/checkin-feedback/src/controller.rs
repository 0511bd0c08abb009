//! Feedback Display Controller.
//!
//! Renders short status messages on the kiosk panel and scrolls lines that do
//! not fit. Display hardware is optional: the device is opened lazily, any
//! open or write failure switches output to the console sink (a `tracing`
//! event with target `checkin::display`), and every later call tries the
//! device again. Callers never see a display error.
//!
//! # Scrolling
//!
//! [`FeedbackDisplay::show_scrolling`] spawns one task per long line. The tasks
//! share a [`CancellationToken`]; any later call cancels it and waits for the
//! tasks with a bounded join before drawing. A task that does not stop in time
//! is abandoned.
//!
//! # Blocking devices
//!
//! I2C panels are driven with blocking syscalls. For such targets every
//! device access runs on the blocking pool so marquee tasks and callers never
//! stall a runtime worker.
//!
//! # Examples
//!
//! ```
//! use checkin_feedback::{FeedbackConfig, FeedbackDisplay};
//! use checkin_hardware::DisplayTarget;
//! use checkin_hardware::mock::VirtualPanel;
//!
//! #[tokio::main]
//! async fn main() {
//!     let panel = VirtualPanel::new(16, 2);
//!     let display = FeedbackDisplay::new(FeedbackConfig::new(DisplayTarget::Virtual(panel.clone())));
//!
//!     display.show_message("Recorded", "Ada Lovelace", None).await;
//!     assert_eq!(panel.trimmed_lines(), vec!["Recorded", "Ada Lovelace"]);
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use checkin_core::constants::{
    DEFAULT_DISPLAY_COLUMNS, DEFAULT_IDLE_MESSAGE, DEFAULT_SCROLL_STEP_MS, SCROLL_JOIN_TIMEOUT_MS,
};
use checkin_hardware::{AnyDisplayDevice, DisplayDevice, DisplayTarget, HardwareError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::text::{
    Alignment, align_text, marquee_frames, needs_scrolling, sanitize_text, truncate_text,
};

/// Tracing target of the console sink.
pub const CONSOLE_TARGET: &str = "checkin::display";

/// Display controller settings.
#[derive(Debug, Clone)]
pub struct FeedbackConfig {
    pub target: DisplayTarget,
    /// Row width assumed while no device is attached.
    pub columns: usize,
    pub idle_message: String,
    /// Placement of the idle text.
    pub idle_alignment: Alignment,
    /// Delay between marquee frames.
    pub scroll_step: Duration,
    /// Upper bound on waiting for a cancelled marquee task.
    pub join_timeout: Duration,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self::new(DisplayTarget::Console)
    }
}

impl FeedbackConfig {
    pub fn new(target: DisplayTarget) -> Self {
        Self {
            target,
            columns: DEFAULT_DISPLAY_COLUMNS,
            idle_message: DEFAULT_IDLE_MESSAGE.to_string(),
            idle_alignment: Alignment::Center,
            scroll_step: Duration::from_millis(DEFAULT_SCROLL_STEP_MS),
            join_timeout: Duration::from_millis(SCROLL_JOIN_TIMEOUT_MS),
        }
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_idle_message(mut self, message: impl Into<String>) -> Self {
        self.idle_message = message.into();
        self
    }

    pub fn with_idle_alignment(mut self, alignment: Alignment) -> Self {
        self.idle_alignment = alignment;
        self
    }

    pub fn with_scroll_step(mut self, step: Duration) -> Self {
        self.scroll_step = step;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}

#[derive(Debug, Default)]
struct DeviceSlot {
    device: Option<AnyDisplayDevice>,
    /// Last open or write failed; output is on the console sink.
    degraded: bool,
}

#[derive(Debug)]
struct ScrollSession {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    config: FeedbackConfig,
    slot: Mutex<DeviceSlot>,
    scroll: tokio::sync::Mutex<Option<ScrollSession>>,
}

/// Cloneable handle to the kiosk display.
#[derive(Debug, Clone)]
pub struct FeedbackDisplay {
    inner: Arc<Inner>,
}

impl FeedbackDisplay {
    /// Create the controller. Nothing is opened until the first message.
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                slot: Mutex::new(DeviceSlot::default()),
                scroll: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// A controller that only logs.
    pub fn console() -> Self {
        Self::new(FeedbackConfig::default())
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.inner.config
    }

    /// Show two static lines, truncated to the panel width.
    ///
    /// Stops any marquee first. With `hold`, returns only after the message
    /// has been visible for that long.
    pub async fn show_message(&self, line1: &str, line2: &str, hold: Option<Duration>) {
        self.stop_scrolling().await;

        let lines = [sanitize_text(line1), sanitize_text(line2)];
        self.render(lines.to_vec(), lines.to_vec()).await;

        if let Some(hold) = hold {
            tokio::time::sleep(hold).await;
        }
    }

    /// Show two lines, scrolling each one that is wider than the panel.
    ///
    /// Replaces any running marquee. Short lines are drawn once.
    pub async fn show_scrolling(&self, line1: &str, line2: &str, step: Duration) {
        let mut scroll = self.inner.scroll.lock().await;
        self.inner.stop_session(&mut scroll).await;

        let lines = [sanitize_text(line1), sanitize_text(line2)];
        let (columns, rows) = self.geometry().await;
        let statics = lines.clone().map(|l| {
            if needs_scrolling(&l, columns) {
                String::new()
            } else {
                l
            }
        });

        if !self.render(statics.to_vec(), lines.to_vec()).await {
            return;
        }

        let token = CancellationToken::new();
        let handles: Vec<JoinHandle<()>> = lines
            .iter()
            .enumerate()
            .take(rows)
            .filter(|(_, line)| needs_scrolling(line, columns))
            .map(|(row, line)| {
                let frames = marquee_frames(line, columns);
                tokio::spawn(run_marquee(
                    Arc::clone(&self.inner),
                    row,
                    frames,
                    step,
                    token.clone(),
                ))
            })
            .collect();

        if !handles.is_empty() {
            debug!(tasks = handles.len(), step_ms = step.as_millis() as u64, "Marquee started");
            *scroll = Some(ScrollSession { token, handles });
        }
    }

    /// Static message if both lines fit, otherwise scrolling with the
    /// configured step.
    pub async fn show_feedback(&self, line1: &str, line2: &str) {
        let columns = self.geometry().await.0;
        if needs_scrolling(line1, columns) || needs_scrolling(line2, columns) {
            self.show_scrolling(line1, line2, self.inner.config.scroll_step)
                .await;
        } else {
            self.show_message(line1, line2, None).await;
        }
    }

    /// Show two static lines placed with `alignment`.
    ///
    /// Lines wider than the panel scroll instead, as with
    /// [`FeedbackDisplay::show_feedback`].
    ///
    /// ```
    /// use checkin_feedback::{Alignment, FeedbackConfig, FeedbackDisplay};
    /// use checkin_hardware::DisplayTarget;
    /// use checkin_hardware::mock::VirtualPanel;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let panel = VirtualPanel::new(8, 2);
    /// let display = FeedbackDisplay::new(FeedbackConfig::new(DisplayTarget::Virtual(panel.clone())));
    ///
    /// display.show_aligned("OK", "", Alignment::Right).await;
    /// assert_eq!(panel.trimmed_lines(), vec!["      OK", ""]);
    /// # }
    /// ```
    pub async fn show_aligned(&self, line1: &str, line2: &str, alignment: Alignment) {
        let lines = [sanitize_text(line1), sanitize_text(line2)];
        let columns = self.geometry().await.0;
        if lines.iter().any(|l| needs_scrolling(l, columns)) {
            self.show_scrolling(&lines[0], &lines[1], self.inner.config.scroll_step)
                .await;
            return;
        }

        self.stop_scrolling().await;
        let placed = lines
            .iter()
            .map(|l| {
                if l.is_empty() {
                    String::new()
                } else {
                    align_text(l, columns, alignment)
                }
            })
            .collect();
        self.render(placed, lines.to_vec()).await;
    }

    /// Show the idle text with the configured alignment.
    pub async fn show_idle(&self) {
        let idle = self.inner.config.idle_message.clone();
        self.show_aligned(&idle, "", self.inner.config.idle_alignment)
            .await;
    }

    /// Blank the panel.
    pub async fn clear(&self) {
        self.stop_scrolling().await;
        self.render(vec![String::new(), String::new()], Vec::new())
            .await;
    }

    /// Cancel the running marquee, if any, and wait for its tasks.
    pub async fn stop_scrolling(&self) {
        let mut scroll = self.inner.scroll.lock().await;
        self.inner.stop_session(&mut scroll).await;
    }

    /// Returns `true` while a marquee is running.
    pub async fn is_scrolling(&self) -> bool {
        self.inner.scroll.lock().await.is_some()
    }

    /// Returns `true` if output currently reaches a device.
    pub fn is_device_active(&self) -> bool {
        self.inner.lock_slot().device.is_some()
    }

    async fn geometry(&self) -> (usize, usize) {
        let fallback = (self.inner.config.columns, 2);
        device_io(&self.inner, Inner::geometry)
            .await
            .unwrap_or(fallback)
    }

    async fn render(&self, device_lines: Vec<String>, console_lines: Vec<String>) -> bool {
        let drawn = device_io(&self.inner, move |inner| {
            inner.render(&device_lines, &console_lines)
        })
        .await;
        drawn.unwrap_or(false)
    }
}

/// Run `op` against the device slot, on the blocking pool when the target
/// blocks. `None` if the blocking task panicked.
async fn device_io<T, F>(inner: &Arc<Inner>, op: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&Inner) -> T + Send + 'static,
{
    if !inner.config.target.is_blocking() {
        return Some(op(inner.as_ref()));
    }

    let inner = Arc::clone(inner);
    match tokio::task::spawn_blocking(move || op(inner.as_ref())).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Display I/O task failed");
            None
        }
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, DeviceSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open the device if there is none. Returns `true` if one is attached.
    fn ensure_device(&self, slot: &mut DeviceSlot) -> bool {
        if slot.device.is_some() {
            return true;
        }

        match self.config.target.open() {
            Ok(Some(device)) => {
                if slot.degraded {
                    info!(target_device = %self.config.target.label(), "Display reinitialized");
                } else {
                    debug!(target_device = %self.config.target.label(), "Display initialized");
                }
                slot.degraded = false;
                slot.device = Some(device);
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.degrade(slot, &e);
                false
            }
        }
    }

    fn degrade(&self, slot: &mut DeviceSlot, error: &HardwareError) {
        slot.device = None;
        if slot.degraded {
            debug!(error = %error, "Display still unavailable");
        } else {
            warn!(
                target_device = %self.config.target.label(),
                error = %error,
                "Display unavailable, falling back to console"
            );
        }
        slot.degraded = true;
    }

    /// Width and height of the current output.
    fn geometry(&self) -> (usize, usize) {
        let mut slot = self.lock_slot();
        if self.ensure_device(&mut slot) {
            if let Some(device) = slot.device.as_ref() {
                return (device.columns(), device.rows());
            }
        }
        (self.config.columns, 2)
    }

    /// Draw `device_lines` on the device, or log `console_lines` when there is
    /// no working device. Returns `true` if the device took the output.
    fn render(&self, device_lines: &[String], console_lines: &[String]) -> bool {
        {
            let mut slot = self.lock_slot();
            if self.ensure_device(&mut slot) {
                let result = match slot.device.as_mut() {
                    Some(device) => draw(device, device_lines),
                    None => Ok(()),
                };
                match result {
                    Ok(()) => return true,
                    Err(e) => self.degrade(&mut slot, &e),
                }
            }
        }

        console_sink(console_lines, self.config.columns);
        false
    }

    /// Write one marquee frame. Returns `false` once the device is gone.
    fn write_frame(&self, row: usize, frame: &str) -> bool {
        let mut slot = self.lock_slot();
        let result = match slot.device.as_mut() {
            Some(device) => device.write_line(row, frame),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.degrade(&mut slot, &e);
                false
            }
        }
    }

    async fn stop_session(&self, scroll: &mut Option<ScrollSession>) {
        let Some(session) = scroll.take() else {
            return;
        };
        session.token.cancel();

        for handle in session.handles {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Marquee task ended abnormally"),
                Err(_) => warn!(
                    timeout_ms = self.config.join_timeout.as_millis() as u64,
                    "Marquee task did not stop in time, abandoning it"
                ),
            }
        }
        debug!("Marquee stopped");
    }
}

fn draw(device: &mut AnyDisplayDevice, lines: &[String]) -> checkin_hardware::Result<()> {
    device.clear()?;
    let columns = device.columns();
    for (row, line) in lines.iter().enumerate().take(device.rows()) {
        device.write_line(row, &truncate_text(line, columns))?;
    }
    Ok(())
}

fn console_sink(lines: &[String], columns: usize) {
    let line1 = lines.first().map(String::as_str).unwrap_or_default();
    let line2 = lines.get(1).map(String::as_str).unwrap_or_default();
    info!(
        target: CONSOLE_TARGET,
        line1 = %line1,
        line2 = %line2,
        columns,
        "[display] {line1} | {line2}"
    );
}

async fn run_marquee(
    inner: Arc<Inner>,
    row: usize,
    frames: Vec<String>,
    step: Duration,
    token: CancellationToken,
) {
    for frame in frames.iter().cycle() {
        if token.is_cancelled() {
            break;
        }
        let frame = frame.clone();
        let written = device_io(&inner, move |inner| inner.write_frame(row, &frame)).await;
        if written != Some(true) {
            break;
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(step) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_hardware::mock::VirtualPanel;

    const STEP: Duration = Duration::from_millis(100);

    fn panel_display() -> (VirtualPanel, FeedbackDisplay) {
        let panel = VirtualPanel::new(16, 2);
        let display = FeedbackDisplay::new(
            FeedbackConfig::new(DisplayTarget::Virtual(panel.clone())).with_scroll_step(STEP),
        );
        (panel, display)
    }

    #[tokio::test]
    async fn test_device_opened_lazily() {
        let (panel, display) = panel_display();
        assert_eq!(panel.open_count(), 0);

        display.show_idle().await;
        assert_eq!(panel.open_count(), 1);
        assert_eq!(panel.trimmed_lines(), vec!["  System Ready", ""]);

        display.show_message("Scan ID card", "", None).await;
        assert_eq!(panel.open_count(), 1);
    }

    #[tokio::test]
    async fn test_show_message_truncates_and_clears() {
        let (panel, display) = panel_display();
        display
            .show_message("Physics 101 Final Exam", "Scan ID card", None)
            .await;
        assert_eq!(panel.trimmed_lines(), vec!["Physics 101 Fina", "Scan ID card"]);

        display.show_message("Recorded", "", None).await;
        assert_eq!(panel.trimmed_lines(), vec!["Recorded", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_message_holds() {
        let (_panel, display) = panel_display();
        let start = tokio::time::Instant::now();
        display
            .show_message("Recorded", "", Some(Duration::from_secs(2)))
            .await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_console_target_never_fails() {
        let display = FeedbackDisplay::console();
        display.show_message("Recorded", "Ada", None).await;
        display.show_scrolling("A very long line that scrolls", "", STEP).await;
        display.clear().await;

        assert!(!display.is_device_active());
        assert!(!display.is_scrolling().await);
    }

    #[tokio::test]
    async fn test_write_failure_falls_back_then_recovers() {
        let (panel, display) = panel_display();
        display.show_idle().await;
        assert!(display.is_device_active());

        panel.set_fail_writes(true);
        display.show_message("Recorded", "", None).await;
        assert!(!display.is_device_active());

        panel.set_fail_writes(false);
        display.show_message("Scan booklet", "", None).await;
        assert!(display.is_device_active());
        assert_eq!(panel.open_count(), 2);
        assert_eq!(panel.trimmed_lines(), vec!["Scan booklet", ""]);
    }

    #[tokio::test]
    async fn test_open_failure_retried_on_every_call() {
        let (panel, display) = panel_display();
        panel.set_fail_open(true);

        display.show_message("Recorded", "", None).await;
        display.show_message("Recorded", "", None).await;
        assert!(!display.is_device_active());
        assert_eq!(panel.open_count(), 0);

        panel.set_fail_open(false);
        display.show_message("Recorded", "", None).await;
        assert!(display.is_device_active());
        assert_eq!(panel.trimmed_lines(), vec!["Recorded", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrolling_moves_long_line_only() {
        let (panel, display) = panel_display();
        display
            .show_scrolling("Duplicate booklet BK001", "Ada", STEP)
            .await;
        assert!(display.is_scrolling().await);

        tokio::time::sleep(STEP * 20).await;

        let row0: Vec<String> = panel
            .writes()
            .into_iter()
            .filter(|(row, _)| *row == 0)
            .map(|(_, text)| text)
            .collect();
        assert!(row0.len() > 10, "expected marquee frames, got {}", row0.len());
        assert!(row0.iter().any(|f| f.starts_with("Duplicate")));
        assert_eq!(panel.line(1).unwrap().trim_end(), "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_message_cancels_marquee() {
        let (panel, display) = panel_display();
        display
            .show_scrolling("Duplicate booklet BK001", "Claimed by Ada Lovelace", STEP)
            .await;
        tokio::time::sleep(STEP * 5).await;

        display.show_message("Scan ID card", "", None).await;
        assert!(!display.is_scrolling().await);

        let writes_after_stop = panel.writes().len();
        tokio::time::sleep(STEP * 10).await;
        assert_eq!(panel.writes().len(), writes_after_stop);
        assert_eq!(panel.trimmed_lines(), vec!["Scan ID card", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrolling_replaces_previous_marquee() {
        let (panel, display) = panel_display();
        display
            .show_scrolling("First long message on the panel", "", STEP)
            .await;
        tokio::time::sleep(STEP * 3).await;
        display
            .show_scrolling("Second long message on the panel", "", STEP)
            .await;
        tokio::time::sleep(STEP * 40).await;

        let last = panel.writes().last().cloned().unwrap();
        assert_eq!(last.0, 0);
        assert!(
            !panel.writes().iter().rev().take(20).any(|(_, f)| f.contains("First")),
            "old marquee still running"
        );
        display.stop_scrolling().await;
    }

    #[tokio::test]
    async fn test_idle_alignment() {
        let panel = VirtualPanel::new(16, 2);
        let display = FeedbackDisplay::new(
            FeedbackConfig::new(DisplayTarget::Virtual(panel.clone()))
                .with_idle_message("Ready")
                .with_idle_alignment(Alignment::Left),
        );
        display.show_idle().await;
        assert_eq!(panel.trimmed_lines(), vec!["Ready", ""]);

        display.show_aligned("Ready", "10.0.0.7", Alignment::Center).await;
        assert_eq!(panel.line(0).unwrap(), "     Ready      ");
        assert_eq!(panel.line(1).unwrap(), "    10.0.0.7    ");
    }

    #[tokio::test]
    async fn test_long_idle_text_scrolls() {
        let panel = VirtualPanel::new(16, 2);
        let display = FeedbackDisplay::new(
            FeedbackConfig::new(DisplayTarget::Virtual(panel.clone()))
                .with_idle_message("Welcome to the exam hall"),
        );
        display.show_idle().await;
        assert!(display.is_scrolling().await);
        display.stop_scrolling().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_target_falls_back_without_stalling() {
        let target = DisplayTarget::I2c {
            bus: 250,
            address: 0x27,
            columns: 16,
            rows: 2,
        };
        assert!(target.is_blocking());
        let display = FeedbackDisplay::new(FeedbackConfig::new(target).with_scroll_step(STEP));

        display.show_idle().await;
        display
            .show_scrolling("A line that is far too long", "", STEP)
            .await;
        display.show_message("Recorded", "Ada", None).await;
        display.clear().await;

        assert!(!display.is_device_active());
        assert!(!display.is_scrolling().await);
    }

    #[tokio::test]
    async fn test_short_lines_do_not_scroll() {
        let (_panel, display) = panel_display();
        display.show_feedback("Recorded", "Ada Lovelace").await;
        assert!(!display.is_scrolling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marquee_stops_when_device_fails() {
        let (panel, display) = panel_display();
        display
            .show_scrolling("A line that is far too long", "", STEP)
            .await;
        tokio::time::sleep(STEP * 2).await;

        panel.set_fail_writes(true);
        tokio::time::sleep(STEP * 2).await;
        assert!(!display.is_device_active());

        display.stop_scrolling().await;
        assert!(!display.is_scrolling().await);
    }
}
