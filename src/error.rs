//! Error types for the codec, router, and input layers.

use thiserror::Error;

/// Errors from bounded story-memory access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {0:#06x} is outside the memory image")]
    OutOfBounds(u32),

    #[error("write to read-only memory at {0:#06x}")]
    ReadOnly(u32),
}

/// Errors from packed-string decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    /// The string ran past the end of the memory image without a terminator
    /// word. Continuing would mean scanning garbage, so this is fatal to the
    /// current operation.
    #[error("packed string at {0:#06x} has no terminator before end of memory")]
    MalformedString(u32),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors from `OutputRouter::set_output_stream`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Stream 3 was enabled while 16 capture frames were already active.
    #[error("output stream 3 nested too deeply")]
    NestingTooDeep,

    /// Stream 3 was enabled with a table address outside writable memory.
    #[error("output stream 3 table address {0:#06x} is out of range")]
    InvalidAddress(u16),

    /// Stream 3 was disabled with no capture frame active.
    #[error("output stream 3 disabled while not capturing")]
    NotCapturing,

    /// The stream number is not 1-4.
    #[error("invalid output stream #{0}")]
    UnknownStream(u16),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors from the async input layer.
///
/// Ordinary cancellation is not an error: a token that is already cancelled
/// when a read starts resolves to the `Cancelled` outcome without touching
/// the backend. `InputError::Cancelled` is raised only after dispatch, when
/// the wait had to be abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The token fired after dispatch and the backend did not finish within
    /// the grace period. The backend call may still be running detached.
    #[error("input cancelled; backend operation abandoned")]
    Cancelled,

    /// A read was requested while another read was still pending. Callers
    /// must serialize input requests.
    #[error("an input request is already pending")]
    AlreadyPending,

    /// The worker thread hosting the blocking call panicked.
    #[error("input worker panicked")]
    WorkerPanicked,
}
