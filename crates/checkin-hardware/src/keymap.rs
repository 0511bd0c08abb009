//! Scanner key table and code assembly.
//!
//! USB barcode scanners present themselves as keyboards: each character of a
//! barcode arrives as a key press, and the code ends with Enter. This module
//! maps Linux input key codes to characters through a fixed table and turns
//! the stream of key presses into completed codes.
//!
//! Shift and other modifiers are not in the table, so letters always come out
//! uppercase, which is what the scanners are configured to emit.
//!
//! # Examples
//!
//! ```
//! use checkin_hardware::keymap::{self, CodeAssembler, KeyOutcome};
//! use checkin_hardware::types::KeyEvent;
//!
//! let mut assembler = CodeAssembler::new();
//! assembler.push(KeyEvent::down(keymap::KEY_S));
//! assembler.push(KeyEvent::down(keymap::KEY_1));
//!
//! assert_eq!(
//!     assembler.push(KeyEvent::down(keymap::KEY_ENTER)),
//!     KeyOutcome::Completed("S1".to_string())
//! );
//! ```

use tracing::debug;

use crate::types::KeyEvent;

// Linux input key codes (include/uapi/linux/input-event-codes.h).
pub const KEY_1: u16 = 2;
pub const KEY_2: u16 = 3;
pub const KEY_3: u16 = 4;
pub const KEY_4: u16 = 5;
pub const KEY_5: u16 = 6;
pub const KEY_6: u16 = 7;
pub const KEY_7: u16 = 8;
pub const KEY_8: u16 = 9;
pub const KEY_9: u16 = 10;
pub const KEY_0: u16 = 11;
pub const KEY_MINUS: u16 = 12;
pub const KEY_EQUAL: u16 = 13;
pub const KEY_Q: u16 = 16;
pub const KEY_W: u16 = 17;
pub const KEY_E: u16 = 18;
pub const KEY_R: u16 = 19;
pub const KEY_T: u16 = 20;
pub const KEY_Y: u16 = 21;
pub const KEY_U: u16 = 22;
pub const KEY_I: u16 = 23;
pub const KEY_O: u16 = 24;
pub const KEY_P: u16 = 25;
pub const KEY_ENTER: u16 = 28;
pub const KEY_A: u16 = 30;
pub const KEY_S: u16 = 31;
pub const KEY_D: u16 = 32;
pub const KEY_F: u16 = 33;
pub const KEY_G: u16 = 34;
pub const KEY_H: u16 = 35;
pub const KEY_J: u16 = 36;
pub const KEY_K: u16 = 37;
pub const KEY_L: u16 = 38;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_BACKSLASH: u16 = 43;
pub const KEY_Z: u16 = 44;
pub const KEY_X: u16 = 45;
pub const KEY_C: u16 = 46;
pub const KEY_V: u16 = 47;
pub const KEY_B: u16 = 48;
pub const KEY_N: u16 = 49;
pub const KEY_M: u16 = 50;
pub const KEY_COMMA: u16 = 51;
pub const KEY_DOT: u16 = 52;
pub const KEY_SLASH: u16 = 53;
pub const KEY_KPASTERISK: u16 = 55;
pub const KEY_SPACE: u16 = 57;
pub const KEY_KP7: u16 = 71;
pub const KEY_KP8: u16 = 72;
pub const KEY_KP9: u16 = 73;
pub const KEY_KPMINUS: u16 = 74;
pub const KEY_KP4: u16 = 75;
pub const KEY_KP5: u16 = 76;
pub const KEY_KP6: u16 = 77;
pub const KEY_KPPLUS: u16 = 78;
pub const KEY_KP1: u16 = 79;
pub const KEY_KP2: u16 = 80;
pub const KEY_KP3: u16 = 81;
pub const KEY_KP0: u16 = 82;
pub const KEY_KPDOT: u16 = 83;
pub const KEY_KPENTER: u16 = 96;
pub const KEY_KPSLASH: u16 = 98;

/// Fixed key table. Each recognized key yields exactly one character.
const KEY_TABLE: &[(u16, char)] = &[
    (KEY_1, '1'),
    (KEY_2, '2'),
    (KEY_3, '3'),
    (KEY_4, '4'),
    (KEY_5, '5'),
    (KEY_6, '6'),
    (KEY_7, '7'),
    (KEY_8, '8'),
    (KEY_9, '9'),
    (KEY_0, '0'),
    (KEY_A, 'A'),
    (KEY_B, 'B'),
    (KEY_C, 'C'),
    (KEY_D, 'D'),
    (KEY_E, 'E'),
    (KEY_F, 'F'),
    (KEY_G, 'G'),
    (KEY_H, 'H'),
    (KEY_I, 'I'),
    (KEY_J, 'J'),
    (KEY_K, 'K'),
    (KEY_L, 'L'),
    (KEY_M, 'M'),
    (KEY_N, 'N'),
    (KEY_O, 'O'),
    (KEY_P, 'P'),
    (KEY_Q, 'Q'),
    (KEY_R, 'R'),
    (KEY_S, 'S'),
    (KEY_T, 'T'),
    (KEY_U, 'U'),
    (KEY_V, 'V'),
    (KEY_W, 'W'),
    (KEY_X, 'X'),
    (KEY_Y, 'Y'),
    (KEY_Z, 'Z'),
    (KEY_MINUS, '-'),
    (KEY_EQUAL, '='),
    (KEY_SLASH, '/'),
    (KEY_BACKSLASH, '\\'),
    (KEY_SPACE, ' '),
    (KEY_DOT, '.'),
    (KEY_COMMA, ','),
    (KEY_KP1, '1'),
    (KEY_KP2, '2'),
    (KEY_KP3, '3'),
    (KEY_KP4, '4'),
    (KEY_KP5, '5'),
    (KEY_KP6, '6'),
    (KEY_KP7, '7'),
    (KEY_KP8, '8'),
    (KEY_KP9, '9'),
    (KEY_KP0, '0'),
    (KEY_KPDOT, '.'),
    (KEY_KPSLASH, '/'),
    (KEY_KPASTERISK, '*'),
    (KEY_KPMINUS, '-'),
    (KEY_KPPLUS, '+'),
];

/// Character produced by `code`, if it is in the table.
pub fn char_for(code: u16) -> Option<char> {
    KEY_TABLE
        .iter()
        .find_map(|&(key, c)| (key == code).then_some(c))
}

/// Returns `true` for the keys that finish a code (Enter, keypad Enter).
pub fn is_terminator(code: u16) -> bool {
    matches!(code, KEY_ENTER | KEY_KPENTER)
}

/// Key that types `c`, preferring the main block over the keypad.
///
/// Lowercase letters map to their uppercase key. Used to simulate scans.
pub fn code_for(c: char) -> Option<u16> {
    let c = c.to_ascii_uppercase();
    KEY_TABLE
        .iter()
        .find_map(|&(key, mapped)| (mapped == c).then_some(key))
}

/// Result of feeding one key event to a [`CodeAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Character appended to the buffer.
    Buffered(char),
    /// Terminator received; the assembled code, buffer now empty.
    Completed(String),
    /// Terminator received with an empty buffer.
    Empty,
    /// Key not in the table; logged and dropped.
    Ignored(u16),
    /// Key release or autorepeat; only presses count.
    Skipped,
}

/// Append-only buffer turning key presses into codes.
#[derive(Debug, Default)]
pub struct CodeAssembler {
    buffer: String,
}

impl CodeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key event.
    pub fn push(&mut self, event: KeyEvent) -> KeyOutcome {
        if !event.is_down() {
            return KeyOutcome::Skipped;
        }

        if is_terminator(event.code) {
            if self.buffer.is_empty() {
                debug!("Enter pressed with empty buffer, ignoring");
                return KeyOutcome::Empty;
            }
            return KeyOutcome::Completed(std::mem::take(&mut self.buffer));
        }

        match char_for(event.code) {
            Some(c) => {
                self.buffer.push(c);
                KeyOutcome::Buffered(c)
            }
            None => {
                debug!(keycode = event.code, "Unmapped key ignored");
                KeyOutcome::Ignored(event.code)
            }
        }
    }

    /// Characters collected since the last terminator.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Drop any partial code.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyState;
    use proptest::prelude::*;
    use rstest::rstest;

    fn type_str(assembler: &mut CodeAssembler, text: &str) -> Vec<KeyOutcome> {
        text.chars()
            .map(|c| assembler.push(KeyEvent::down(code_for(c).unwrap())))
            .collect()
    }

    #[rstest]
    #[case(KEY_1, '1')]
    #[case(KEY_0, '0')]
    #[case(KEY_A, 'A')]
    #[case(KEY_Z, 'Z')]
    #[case(KEY_BACKSLASH, '\\')]
    #[case(KEY_SPACE, ' ')]
    #[case(KEY_KP7, '7')]
    #[case(KEY_KPASTERISK, '*')]
    #[case(KEY_KPPLUS, '+')]
    #[case(KEY_KPSLASH, '/')]
    fn test_char_for(#[case] code: u16, #[case] expected: char) {
        assert_eq!(char_for(code), Some(expected));
    }

    #[rstest]
    #[case(KEY_ENTER)]
    #[case(KEY_KPENTER)]
    #[case(KEY_LEFTSHIFT)]
    fn test_non_character_keys(#[case] code: u16) {
        assert_eq!(char_for(code), None);
    }

    #[test]
    fn test_terminators() {
        assert!(is_terminator(KEY_ENTER));
        assert!(is_terminator(KEY_KPENTER));
        assert!(!is_terminator(KEY_A));
    }

    #[test]
    fn test_code_for_prefers_main_block() {
        assert_eq!(code_for('7'), Some(KEY_7));
        assert_eq!(code_for('-'), Some(KEY_MINUS));
        assert_eq!(code_for('b'), Some(KEY_B));
        assert_eq!(code_for('*'), Some(KEY_KPASTERISK));
        assert_eq!(code_for('#'), None);
    }

    #[test]
    fn test_assembles_code_on_enter() {
        let mut assembler = CodeAssembler::new();
        type_str(&mut assembler, "BK001");
        assert_eq!(assembler.pending(), "BK001");

        let outcome = assembler.push(KeyEvent::down(KEY_ENTER));
        assert_eq!(outcome, KeyOutcome::Completed("BK001".to_string()));
        assert_eq!(assembler.pending(), "");
    }

    #[test]
    fn test_keypad_enter_terminates() {
        let mut assembler = CodeAssembler::new();
        assembler.push(KeyEvent::down(KEY_KP4));
        assembler.push(KeyEvent::down(KEY_KP2));
        assert_eq!(
            assembler.push(KeyEvent::down(KEY_KPENTER)),
            KeyOutcome::Completed("42".to_string())
        );
    }

    #[test]
    fn test_enter_on_empty_buffer_is_noop() {
        let mut assembler = CodeAssembler::new();
        assert_eq!(assembler.push(KeyEvent::down(KEY_ENTER)), KeyOutcome::Empty);
        assert_eq!(assembler.pending(), "");
    }

    #[test]
    fn test_releases_and_repeats_are_skipped() {
        let mut assembler = CodeAssembler::new();
        assert_eq!(assembler.push(KeyEvent::up(KEY_A)), KeyOutcome::Skipped);
        assert_eq!(
            assembler.push(KeyEvent {
                code: KEY_A,
                state: KeyState::Repeat
            }),
            KeyOutcome::Skipped
        );
        assert_eq!(assembler.pending(), "");
    }

    #[test]
    fn test_unmapped_key_is_ignored() {
        let mut assembler = CodeAssembler::new();
        assembler.push(KeyEvent::down(KEY_S));
        assert_eq!(
            assembler.push(KeyEvent::down(KEY_LEFTSHIFT)),
            KeyOutcome::Ignored(KEY_LEFTSHIFT)
        );
        assembler.push(KeyEvent::down(KEY_1));
        assert_eq!(assembler.pending(), "S1");
    }

    #[test]
    fn test_reset_drops_partial_code() {
        let mut assembler = CodeAssembler::new();
        type_str(&mut assembler, "S10");
        assembler.reset();
        assert_eq!(assembler.push(KeyEvent::down(KEY_ENTER)), KeyOutcome::Empty);
    }

    proptest! {
        #[test]
        fn prop_typed_codes_come_back_verbatim(code in "[A-Z0-9./=,+*-]{1,40}") {
            let mut assembler = CodeAssembler::new();
            for c in code.chars() {
                let key = code_for(c).unwrap();
                prop_assert_eq!(assembler.push(KeyEvent::down(key)), KeyOutcome::Buffered(c));
                prop_assert_eq!(assembler.push(KeyEvent::up(key)), KeyOutcome::Skipped);
            }
            prop_assert_eq!(
                assembler.push(KeyEvent::down(KEY_ENTER)),
                KeyOutcome::Completed(code.clone())
            );
        }
    }
}
