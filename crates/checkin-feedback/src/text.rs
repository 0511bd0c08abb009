//! Text shaping for fixed-width character displays.

/// Horizontal placement of text within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    /// Extra space goes on the right when the padding is odd.
    Center,
    Right,
}

/// Keep at most `max_chars` characters.
///
/// ```
/// use checkin_feedback::text::truncate_text;
///
/// assert_eq!(truncate_text("Scan booklet now", 12), "Scan booklet");
/// ```
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Align text within `width` columns, padding with spaces.
///
/// The result is always exactly `width` characters; longer text is truncated.
///
/// ```
/// use checkin_feedback::text::{align_text, Alignment};
///
/// assert_eq!(align_text("OK", 6, Alignment::Left), "OK    ");
/// assert_eq!(align_text("OK", 6, Alignment::Center), "  OK  ");
/// assert_eq!(align_text("OK", 6, Alignment::Right), "    OK");
/// ```
pub fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let text = truncate_text(text, width);
    let slack = width - text.chars().count();
    let left = match alignment {
        Alignment::Left => 0,
        Alignment::Center => slack / 2,
        Alignment::Right => slack,
    };
    format!("{:left$}{text}{:right$}", "", "", right = slack - left)
}

/// Make text safe for a character LCD.
///
/// Control characters are dropped, anything outside printable ASCII becomes
/// `?`, and surrounding whitespace is trimmed.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns `true` if `text` does not fit in `columns` and must scroll.
pub fn needs_scrolling(text: &str, columns: usize) -> bool {
    text.chars().count() > columns
}

/// Frames of a right-to-left marquee.
///
/// The text is padded with a full row of blanks on each side and every
/// `columns`-wide window is returned in order, so the text enters from the
/// right edge and leaves completely on the left before the cycle repeats.
///
/// ```
/// use checkin_feedback::text::marquee_frames;
///
/// let frames = marquee_frames("AB", 2);
/// assert_eq!(frames, vec!["  ", " A", "AB", "B ", "  "]);
/// ```
pub fn marquee_frames(text: &str, columns: usize) -> Vec<String> {
    if columns == 0 {
        return Vec::new();
    }

    let padded: Vec<char> = std::iter::repeat_n(' ', columns)
        .chain(text.chars())
        .chain(std::iter::repeat_n(' ', columns))
        .collect();

    padded
        .windows(columns)
        .map(|window| window.iter().collect())
        .collect()
}
