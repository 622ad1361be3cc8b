//! Terminal escape sequence handling.

use std::borrow::Cow;

const ESC: char = '\x1b';

/// Select Graphic Rendition reset, appended to every formatted line.
pub const RESET: &str = "\x1b[0m";

/// Reports whether `text` contains an escape character.
#[must_use]
pub fn contains_escape(text: &str) -> bool {
    text.contains(ESC)
}

/// Removes terminal escape sequences from `text`.
///
/// CSI sequences, OSC strings and two-character escapes are removed; tabs are
/// kept. Text without escapes is returned borrowed.
///
/// # Examples
///
/// ```
/// use logging_sink::strip_escapes;
///
/// assert_eq!(strip_escapes("\x1b[1m\x1b[31mERROR\x1b[0m boom"), "ERROR boom");
/// assert_eq!(strip_escapes("plain"), "plain");
/// ```
#[must_use]
pub fn strip_escapes(text: &str) -> Cow<'_, str> {
    if !contains_escape(text) {
        return Cow::Borrowed(text);
    }

    // the parser executes only newlines among C0 controls
    let segments: Vec<String> = text.split('\t').map(strip_ansi_escapes::strip_str).collect();
    Cow::Owned(segments.join("\t"))
}
