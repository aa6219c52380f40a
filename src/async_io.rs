//! Cancellable async wrappers over the blocking backend.
//!
//! The backend interface is blocking, with at best a periodic interrupt
//! callback during timed input. Each call is hosted on a blocking worker so
//! the caller keeps an awaitable, cancellable surface; cancellation intent
//! travels through the shared token rather than thread interruption. For
//! backends without timed input, cancellation frees the caller - it does
//! not guarantee the backend operation stops.

use crate::error::InputError;
use crate::io::{BackendFile, InputInterrupt, IoBackend, ReadLineResult};
use crate::zscii::CharTables;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Interrupt poll interval passed to timed backends, in tenths of a second.
const POLL_INTERVAL_TENTHS: u16 = 1;

/// How long a cancelled read waits for a timed backend to cooperate before
/// the wait is abandoned.
const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// The async input surface for one interpreter instance.
///
/// Input is the interpreter's only suspension point: callers must serialize
/// requests, and starting a read while one is pending is an error.
pub struct AsyncIo {
    io: Arc<dyn IoBackend>,
    tables: Arc<CharTables>,
    read_pending: AtomicBool,
}

impl AsyncIo {
    pub fn new(io: Arc<dyn IoBackend>, tables: Arc<CharTables>) -> Self {
        AsyncIo {
            io,
            tables,
            read_pending: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<dyn IoBackend> {
        &self.io
    }

    /// Read a line of player input.
    ///
    /// A token that is already cancelled resolves to
    /// [`ReadLineResult::Cancelled`] without touching the backend.
    /// [`InputError::Cancelled`] is returned only when a dispatched read had
    /// to be abandoned: immediately for untimed backends, after the grace
    /// period for timed backends that fail to cooperate.
    pub async fn read_line(
        &self,
        initial: &str,
        terminating_keys: &[u8],
        allow_debugger_break: bool,
        cancel: &CancellationToken,
    ) -> Result<ReadLineResult, InputError> {
        if cancel.is_cancelled() {
            return Ok(ReadLineResult::Cancelled);
        }
        let _guard = self.begin_read()?;

        let io = Arc::clone(&self.io);
        let initial = initial.to_owned();
        let keys = terminating_keys.to_owned();

        if !self.io.timed_input_available() {
            // The backend cannot poll our token; all we can cancel is the wait.
            let worker = spawn_blocking(move || {
                let mut never = || InputInterrupt::Continue;
                io.read_line(&initial, 0, &mut never, &keys, allow_debugger_break)
            });
            await_worker(worker, cancel, false).await
        } else {
            let token = cancel.clone();
            let worker = spawn_blocking(move || {
                let mut interrupt = move || {
                    if token.is_cancelled() {
                        InputInterrupt::Cancel
                    } else {
                        InputInterrupt::Continue
                    }
                };
                io.read_line(
                    &initial,
                    POLL_INTERVAL_TENTHS,
                    &mut interrupt,
                    &keys,
                    allow_debugger_break,
                )
            });
            await_worker(worker, cancel, true).await
        }
    }

    /// Read a single key of player input without echo.
    ///
    /// Returns the ZSCII code of the key, or 0 when cancelled before or
    /// during the read; the error paths match [`read_line`].
    ///
    /// [`read_line`]: AsyncIo::read_line
    pub async fn read_key(&self, cancel: &CancellationToken) -> Result<i16, InputError> {
        if cancel.is_cancelled() {
            return Ok(0);
        }
        let _guard = self.begin_read()?;

        let io = Arc::clone(&self.io);
        let tables = Arc::clone(&self.tables);

        if !self.io.timed_input_available() {
            let worker = spawn_blocking(move || {
                let mut never = || InputInterrupt::Continue;
                let translator = |ch: char| tables.zscii_from_char(ch) as i16;
                io.read_key(0, &mut never, &translator)
            });
            await_worker(worker, cancel, false).await
        } else {
            let token = cancel.clone();
            let worker = spawn_blocking(move || {
                let mut interrupt = move || {
                    if token.is_cancelled() {
                        InputInterrupt::Cancel
                    } else {
                        InputInterrupt::Continue
                    }
                };
                let translator = |ch: char| tables.zscii_from_char(ch) as i16;
                io.read_key(POLL_INTERVAL_TENTHS, &mut interrupt, &translator)
            });
            await_worker(worker, cancel, true).await
        }
    }

    /// Open the save-file stream on a worker.
    ///
    /// File openers are not cancellable mid-flight (the file picker is
    /// expected to resolve quickly); a token that is already cancelled
    /// short-circuits before dispatch.
    pub async fn open_save_file(
        &self,
        size: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<BackendFile>, InputError> {
        if cancel.is_cancelled() {
            return Err(InputError::Cancelled);
        }
        let io = Arc::clone(&self.io);
        run_opener(spawn_blocking(move || io.open_save_file(size))).await
    }

    /// Open the restore-file stream on a worker. See [`open_save_file`].
    ///
    /// [`open_save_file`]: AsyncIo::open_save_file
    pub async fn open_restore_file(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<BackendFile>, InputError> {
        if cancel.is_cancelled() {
            return Err(InputError::Cancelled);
        }
        let io = Arc::clone(&self.io);
        run_opener(spawn_blocking(move || io.open_restore_file())).await
    }

    /// Open an auxiliary-data stream on a worker. See [`open_save_file`].
    ///
    /// [`open_save_file`]: AsyncIo::open_save_file
    pub async fn open_auxiliary_file(
        &self,
        name: &str,
        size: usize,
        writing: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<BackendFile>, InputError> {
        if cancel.is_cancelled() {
            return Err(InputError::Cancelled);
        }
        let io = Arc::clone(&self.io);
        let name = name.to_owned();
        run_opener(spawn_blocking(move || {
            io.open_auxiliary_file(&name, size, writing)
        }))
        .await
    }

    /// Open a command-file stream on a worker. See [`open_save_file`].
    ///
    /// [`open_save_file`]: AsyncIo::open_save_file
    pub async fn open_command_file(
        &self,
        writing: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<BackendFile>, InputError> {
        if cancel.is_cancelled() {
            return Err(InputError::Cancelled);
        }
        let io = Arc::clone(&self.io);
        run_opener(spawn_blocking(move || io.open_command_file(writing))).await
    }

    fn begin_read(&self) -> Result<ReadGuard<'_>, InputError> {
        if self.read_pending.swap(true, Ordering::AcqRel) {
            return Err(InputError::AlreadyPending);
        }
        Ok(ReadGuard(&self.read_pending))
    }
}

/// Clears the in-flight flag when the async call resolves. An abandoned
/// worker may still be running detached at that point; the flag tracks the
/// async surface, which is what callers can serialize.
struct ReadGuard<'a>(&'a AtomicBool);

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Await a blocking worker, honoring the token.
///
/// Timed backends get [`GRACE_PERIOD`] to notice the interrupt callback and
/// return on their own; untimed backends are abandoned immediately. Either
/// way the worker keeps running detached and its result is discarded.
async fn await_worker<T>(
    mut worker: JoinHandle<T>,
    cancel: &CancellationToken,
    timed: bool,
) -> Result<T, InputError> {
    tokio::select! {
        res = &mut worker => res.map_err(|_| InputError::WorkerPanicked),
        _ = cancel.cancelled() => {
            if timed {
                match tokio::time::timeout(GRACE_PERIOD, &mut worker).await {
                    Ok(res) => res.map_err(|_| InputError::WorkerPanicked),
                    Err(_) => {
                        debug!(
                            "backend ignored cancellation for {:?}; abandoning read",
                            GRACE_PERIOD
                        );
                        Err(InputError::Cancelled)
                    }
                }
            } else {
                debug!("cancelled; untimed backend call left to finish detached");
                Err(InputError::Cancelled)
            }
        }
    }
}

async fn run_opener<T>(worker: JoinHandle<T>) -> Result<T, InputError> {
    worker.await.map_err(|_| InputError::WorkerPanicked)
}
