//! The blocking I/O backend seam.
//!
//! Everything that actually touches a screen, keyboard, or file picker
//! lives behind [`IoBackend`]. The trait is deliberately synchronous: that
//! is the shape legacy interface modules have, and the async layer in
//! [`crate::async_io`] hosts these calls on blocking workers.

use std::io::{Read, Write};

/// What a timed-input interrupt callback tells the backend to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputInterrupt {
    Continue,
    Cancel,
}

/// How a line-input request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLineResult {
    /// Input was cancelled through the interrupt callback.
    Cancelled,
    /// The user asked to break into the debugger.
    DebuggerBreak,
    /// The player finished the line with a terminating key.
    Line { text: String, terminator: u8 },
}

impl ReadLineResult {
    /// A line terminated by the enter key (ZSCII 13).
    pub fn line(text: impl Into<String>) -> Self {
        ReadLineResult::Line {
            text: text.into(),
            terminator: 13,
        }
    }

    /// The entered text.
    ///
    /// # Panics
    /// Panics unless the outcome is `Line`; asking for text from a
    /// cancelled read is a programming error, not a value.
    pub fn text(&self) -> &str {
        match self {
            ReadLineResult::Line { text, .. } => text,
            other => panic!("text() on {:?}", other),
        }
    }

    /// ZSCII code of the terminating key.
    ///
    /// # Panics
    /// Panics unless the outcome is `Line`.
    pub fn terminator(&self) -> u8 {
        match self {
            ReadLineResult::Line { terminator, .. } => *terminator,
            other => panic!("terminator() on {:?}", other),
        }
    }
}

/// Interrupt callback polled during timed input.
pub type InterruptFn<'a> = &'a mut dyn FnMut() -> InputInterrupt;

/// Translates a printable character to its ZSCII code for `read_key`.
pub type KeyTranslator<'a> = &'a (dyn Fn(char) -> i16 + Sync);

/// Abstract byte stream handed back by the backend's file openers.
pub trait BackendStream: Read + Write + Send {}

impl<T: Read + Write + Send> BackendStream for T {}

pub type BackendFile = Box<dyn BackendStream>;

/// A synchronous Z-machine I/O backend.
///
/// Methods take `&self`; implementations provide interior mutability so one
/// backend can be shared with the blocking workers in the async layer.
pub trait IoBackend: Send + Sync {
    /// Read a line of input. If `interval_tenths` is nonzero, `interrupt`
    /// should be polled every that many tenths of a second; backends without
    /// timed input ignore it (see [`timed_input_available`]).
    ///
    /// `terminating_keys` lists ZSCII function keys that end input
    /// immediately; 255 means "any function key" and appears alone.
    ///
    /// [`timed_input_available`]: IoBackend::timed_input_available
    fn read_line(
        &self,
        initial: &str,
        interval_tenths: u16,
        interrupt: InterruptFn<'_>,
        terminating_keys: &[u8],
        allow_debugger_break: bool,
    ) -> ReadLineResult;

    /// Read a single key without echoing it. Returns the ZSCII code of the
    /// key, or 0 if input was cancelled through the interrupt callback.
    fn read_key(
        &self,
        interval_tenths: u16,
        interrupt: InterruptFn<'_>,
        translator: KeyTranslator<'_>,
    ) -> i16;

    /// Whether the interrupt callback is actually polled during reads.
    fn timed_input_available(&self) -> bool;

    /// Write a character to the screen.
    fn put_char(&self, ch: char);

    /// Write a string to the screen.
    fn put_string(&self, s: &str);

    /// Whether a transcript file is being written.
    fn transcripting(&self) -> bool;

    /// Turn transcripting on or off. The backend owns the transcript file
    /// and reuses it across off/on toggles within one session.
    fn set_transcripting(&self, enabled: bool);

    fn put_transcript_char(&self, ch: char);

    fn put_transcript_string(&self, s: &str);

    /// Open a stream to write a saved game. `None` means the user declined
    /// to choose a file; that is never an error.
    fn open_save_file(&self, size: usize) -> Option<BackendFile>;

    /// Open a stream to read a previously saved game.
    fn open_restore_file(&self) -> Option<BackendFile>;

    /// Open a stream for auxiliary game data.
    fn open_auxiliary_file(&self, name: &str, size: usize, writing: bool) -> Option<BackendFile>;

    /// Open a stream to record (`writing`) or replay the player's commands.
    fn open_command_file(&self, writing: bool) -> Option<BackendFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_accessors() {
        let r = ReadLineResult::line("go north");
        assert_eq!(r.text(), "go north");
        assert_eq!(r.terminator(), 13);
    }

    #[test]
    #[should_panic(expected = "text() on Cancelled")]
    fn text_of_cancelled_read_panics() {
        let _ = ReadLineResult::Cancelled.text();
    }

    #[test]
    #[should_panic(expected = "terminator() on DebuggerBreak")]
    fn terminator_of_break_panics() {
        let _ = ReadLineResult::DebuggerBreak.terminator();
    }
}
