//! Text codec and I/O subsystem for a Z-machine interpreter.
//!
//! This crate covers three of the interpreter's concerns:
//! - the packed-string codec ([`text`], [`zscii`]): decoding compressed
//!   strings from the story's memory image and encoding dictionary words;
//! - the output stream router ([`stream`]): fanning program output across
//!   the screen, transcript, memory-capture, and command-file sinks;
//! - the async input layer ([`async_io`]): wrapping a blocking, optionally
//!   timed I/O backend with cancellable task-based reads.
//!
//! The opcode dispatcher, object tree, and save formats are collaborators,
//! not part of this crate: it consumes a [`mem::StoryMemory`] image and an
//! [`io::IoBackend`], and produces ZSCII.

pub mod async_io;
pub mod error;
pub mod headless;
pub mod io;
pub mod mem;
pub mod stream;
pub mod text;
pub mod zscii;

pub use async_io::AsyncIo;
pub use error::{InputError, MemoryError, StreamError, TextError};
pub use headless::{HeadlessIo, SharedBuffer};
pub use io::{BackendFile, InputInterrupt, IoBackend, ReadLineResult};
pub use mem::StoryMemory;
pub use stream::{OutputRouter, MAX_CAPTURE_DEPTH};
pub use text::{AbbrevSource, AbbrevTable, ZText};
pub use zscii::{Alphabet, CharTables, DEFAULT_TABLES};
