//! Output stream routing.
//!
//! A running program prints into up to four numbered streams: 1 is the
//! screen, 2 the transcript, 3 a table in dynamic memory, 4 a command file
//! recording the player's input. Stream 3 nests up to 16 levels and is
//! exclusive while active: captured output reaches neither screen nor
//! transcript. Both quirks are numeric contracts of the story-file format,
//! not tunable limits.

use crate::error::StreamError;
use crate::io::{BackendFile, IoBackend};
use crate::mem::StoryMemory;
use crate::zscii::CharTables;
use log::{debug, warn};
use std::io::Write;
use std::sync::Arc;

/// Stream 3 may nest at most this many levels.
pub const MAX_CAPTURE_DEPTH: usize = 16;

struct CaptureFrame {
    table_addr: u16,
    buf: Vec<u8>,
}

/// Writes recorded player input to the stream-4 command file.
struct CommandFileWriter {
    file: BackendFile,
}

impl CommandFileWriter {
    fn new(file: BackendFile) -> Self {
        CommandFileWriter { file }
    }

    fn record(&mut self, text: &str, terminator: u8) {
        // enter-terminated lines replay verbatim; other terminators keep
        // their key code so a replay can tell them apart
        let res = if terminator == 13 {
            writeln!(self.file, "{}", text)
        } else {
            writeln!(self.file, "{}[{}]", text, terminator)
        };
        if let Err(e) = res {
            warn!("command file write failed: {}", e);
        }
    }
}

/// Fans decoded program output across the active sinks.
///
/// Owned by one interpreter instance and driven by its single instruction
/// stream; print ordering is exactly the caller's call order.
pub struct OutputRouter {
    io: Arc<dyn IoBackend>,
    tables: Arc<CharTables>,
    normal_output: bool,
    capture: Vec<CaptureFrame>,
    command_log: Option<CommandFileWriter>,
}

impl OutputRouter {
    pub fn new(io: Arc<dyn IoBackend>, tables: Arc<CharTables>) -> Self {
        OutputRouter {
            io,
            tables,
            normal_output: true,
            capture: Vec::new(),
            command_log: None,
        }
    }

    pub fn normal_output(&self) -> bool {
        self.normal_output
    }

    pub fn capture_active(&self) -> bool {
        !self.capture.is_empty()
    }

    pub fn command_log_active(&self) -> bool {
        self.command_log.is_some()
    }

    /// Print one ZSCII code. Code 0 is a legal no-op in stories.
    pub fn print_zscii(&mut self, zc: i16) {
        if zc == 0 {
            return;
        }
        if let Some(frame) = self.capture.last_mut() {
            frame.buf.push(zc as u8);
        } else {
            let ch = self.tables.char_from_zscii(zc as u16);
            if self.normal_output {
                self.io.put_char(ch);
            }
            if self.io.transcripting() {
                self.io.put_transcript_char(ch);
            }
        }
    }

    pub fn print_char(&mut self, ch: char) {
        if let Some(frame) = self.capture.last_mut() {
            frame.buf.push(self.tables.zscii_from_char(ch) as u8);
        } else {
            if self.normal_output {
                self.io.put_char(ch);
            }
            if self.io.transcripting() {
                self.io.put_transcript_char(ch);
            }
        }
    }

    pub fn print(&mut self, s: &str) {
        if let Some(frame) = self.capture.last_mut() {
            for ch in s.chars() {
                frame.buf.push(self.tables.zscii_from_char(ch) as u8);
            }
        } else {
            if self.normal_output {
                self.io.put_string(s);
            }
            if self.io.transcripting() {
                self.io.put_transcript_string(s);
            }
        }
    }

    /// Record a completed input line to the command file, if stream 4 is on.
    pub fn record_command(&mut self, text: &str, terminator: u8) {
        if let Some(log) = self.command_log.as_mut() {
            log.record(text, terminator);
        }
    }

    /// Enable or disable one of the four output streams. Stream 3 requires
    /// `table_addr` when enabling; the other streams ignore it.
    pub fn set_output_stream(
        &mut self,
        mem: &mut StoryMemory,
        number: u16,
        enabled: bool,
        table_addr: Option<u16>,
    ) -> Result<(), StreamError> {
        match number {
            1 => {
                self.normal_output = enabled;
                Ok(())
            }

            2 => {
                self.io.set_transcripting(enabled);
                Ok(())
            }

            3 if enabled => {
                let addr = table_addr.ok_or(StreamError::InvalidAddress(0))?;
                if self.capture.len() == MAX_CAPTURE_DEPTH {
                    return Err(StreamError::NestingTooDeep);
                }
                if (addr as usize) < 64 || addr as usize + 1 >= mem.rom_start() {
                    return Err(StreamError::InvalidAddress(addr));
                }
                debug!(
                    "stream 3 on, capturing to {:#06x} (depth {})",
                    addr,
                    self.capture.len() + 1
                );
                self.capture.push(CaptureFrame {
                    table_addr: addr,
                    buf: Vec::new(),
                });
                Ok(())
            }

            3 => {
                let frame = self.capture.pop().ok_or(StreamError::NotCapturing)?;
                self.commit_frame(mem, frame)
            }

            4 if enabled => match self.io.open_command_file(true) {
                Some(file) => {
                    self.command_log = Some(CommandFileWriter::new(file));
                    Ok(())
                }
                None => {
                    // no file chosen is not an error; the stream stays off
                    warn!("no command file chosen; stream 4 remains disabled");
                    Ok(())
                }
            },

            4 => {
                self.command_log = None;
                Ok(())
            }

            _ => Err(StreamError::UnknownStream(number)),
        }
    }

    /// Commit a popped capture frame: a 16-bit length word at the table
    /// address, then as many buffer bytes as fit below the read-only
    /// boundary. Excess bytes are silently dropped, matching the legacy
    /// platform's behavior.
    fn commit_frame(
        &mut self,
        mem: &mut StoryMemory,
        frame: CaptureFrame,
    ) -> Result<(), StreamError> {
        let addr = frame.table_addr as u32;
        let room = mem.rom_start().saturating_sub(frame.table_addr as usize + 2);
        let len = frame.buf.len().min(room);
        debug!(
            "stream 3 off, committing {} of {} bytes to {:#06x}",
            len,
            frame.buf.len(),
            addr
        );
        mem.write_word(addr, len as u16)?;
        for (i, b) in frame.buf[..len].iter().enumerate() {
            mem.write_byte(addr + 2 + i as u32, *b)?;
        }
        Ok(())
    }
}
