//! Virtual character panel.
//!
//! In-memory stand-in for the kiosk LCD. Clones share the same state, so a
//! test keeps one clone for inspection while the feedback controller owns
//! another. Failure toggles let tests exercise the console fallback.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{HardwareError, Result, traits::DisplayDevice};

/// Maximum number of writes kept in the history.
const MAX_WRITE_HISTORY: usize = 256;

#[derive(Debug)]
struct PanelState {
    columns: usize,
    rows: usize,
    lines: Vec<String>,
    writes: VecDeque<(usize, String)>,
    fail_writes: bool,
    fail_open: bool,
    opened: usize,
}

/// Shared in-memory display.
///
/// # Examples
///
/// ```
/// use checkin_hardware::mock::VirtualPanel;
/// use checkin_hardware::traits::DisplayDevice;
///
/// let panel = VirtualPanel::new(16, 2);
/// let mut device = panel.clone();
/// device.write_line(0, "System Ready").unwrap();
///
/// assert_eq!(panel.line(0).as_deref(), Some("System Ready    "));
/// ```
#[derive(Debug, Clone)]
pub struct VirtualPanel {
    state: Arc<Mutex<PanelState>>,
}

impl VirtualPanel {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(PanelState {
                columns,
                rows,
                lines: vec![" ".repeat(columns); rows],
                writes: VecDeque::new(),
                fail_writes: false,
                fail_open: false,
                opened: 0,
            })),
        }
    }

    /// Current content of `row`, padded to the column width.
    pub fn line(&self, row: usize) -> Option<String> {
        self.lock().lines.get(row).cloned()
    }

    /// Every row, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.clone()
    }

    /// Rows with trailing blanks removed. Handy in assertions.
    pub fn trimmed_lines(&self) -> Vec<String> {
        self.lock()
            .lines
            .iter()
            .map(|l| l.trim_end().to_string())
            .collect()
    }

    /// Writes accepted so far, oldest first, as `(row, padded text)`.
    pub fn writes(&self) -> Vec<(usize, String)> {
        self.lock().writes.iter().cloned().collect()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make every subsequent [`VirtualPanel::open`] fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.lock().opened
    }

    /// Attach a new driver instance to the panel.
    ///
    /// Mirrors a hardware open: it can fail, and it counts successful opens so
    /// tests can observe re-initialization attempts.
    pub fn open(&self) -> Result<VirtualPanel> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(HardwareError::open_failed(
                "virtual panel unavailable",
            ));
        }
        state.opened += 1;
        Ok(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DisplayDevice for VirtualPanel {
    fn columns(&self) -> usize {
        self.lock().columns
    }

    fn rows(&self) -> usize {
        self.lock().rows
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(HardwareError::display_write("virtual panel write failure"));
        }
        let blank = " ".repeat(state.columns);
        state.lines.iter_mut().for_each(|l| *l = blank.clone());
        Ok(())
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(HardwareError::display_write("virtual panel write failure"));
        }
        if row >= state.rows {
            return Err(HardwareError::invalid_config(format!(
                "row {row} out of range (rows: {})",
                state.rows
            )));
        }

        let columns = state.columns;
        let mut padded: String = text.chars().take(columns).collect();
        let len = padded.chars().count();
        padded.extend(std::iter::repeat_n(' ', columns - len));

        state.lines[row] = padded.clone();
        if state.writes.len() >= MAX_WRITE_HISTORY {
            state.writes.pop_front();
        }
        state.writes.push_back((row, padded));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_panel_is_blank() {
        let panel = VirtualPanel::new(16, 2);
        assert_eq!(panel.lines(), vec![" ".repeat(16), " ".repeat(16)]);
        assert_eq!(panel.columns(), 16);
        assert_eq!(panel.rows(), 2);
    }

    #[test]
    fn test_write_pads_and_truncates() {
        let panel = VirtualPanel::new(8, 2);
        let mut device = panel.clone();

        device.write_line(0, "OK").unwrap();
        device.write_line(1, "Much too long for it").unwrap();

        assert_eq!(panel.line(0).unwrap(), "OK      ");
        assert_eq!(panel.line(1).unwrap(), "Much too");
    }

    #[test]
    fn test_write_replaces_previous_content() {
        let panel = VirtualPanel::new(8, 1);
        let mut device = panel.clone();
        device.write_line(0, "ABCDEFGH").unwrap();
        device.write_line(0, "XY").unwrap();
        assert_eq!(panel.trimmed_lines(), vec!["XY"]);
        assert_eq!(panel.writes().len(), 2);
    }

    #[test]
    fn test_row_out_of_range() {
        let mut panel = VirtualPanel::new(16, 2);
        assert!(panel.write_line(2, "nope").is_err());
    }

    #[test]
    fn test_clear_blanks_rows() {
        let panel = VirtualPanel::new(4, 2);
        let mut device = panel.clone();
        device.write_line(0, "AAAA").unwrap();
        device.clear().unwrap();
        assert_eq!(panel.trimmed_lines(), vec!["", ""]);
    }

    #[test]
    fn test_failure_toggles() {
        let panel = VirtualPanel::new(16, 2);
        let mut device = panel.open().unwrap();
        assert_eq!(panel.open_count(), 1);

        panel.set_fail_writes(true);
        assert!(matches!(
            device.write_line(0, "x"),
            Err(HardwareError::DisplayWrite { .. })
        ));

        panel.set_fail_open(true);
        assert!(panel.open().is_err());
        assert_eq!(panel.open_count(), 1);
    }

    #[test]
    fn test_write_history_is_bounded() {
        let panel = VirtualPanel::new(4, 1);
        let mut device = panel.clone();
        for i in 0..(MAX_WRITE_HISTORY + 10) {
            device.write_line(0, &i.to_string()).unwrap();
        }
        assert_eq!(panel.writes().len(), MAX_WRITE_HISTORY);
    }
}
