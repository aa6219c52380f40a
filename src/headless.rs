//! In-memory I/O backend for tests and non-interactive environments.
//!
//! Collects screen and transcript output without displaying anything, and
//! replays scripted input. The timing knobs let tests model a slow or
//! uncooperative backend for the cancellation paths.

use crate::io::{
    BackendFile, InputInterrupt, InterruptFn, IoBackend, KeyTranslator, ReadLineResult,
};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Byte sink whose contents stay observable after the router or the VM has
/// taken ownership of the boxed stream.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        SharedBuffer::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        lock(&self.0).clone()
    }

    pub fn contents_utf8(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SharedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = lock(&self.0);
        let n = inner.len().min(buf.len());
        buf[..n].copy_from_slice(&inner[..n]);
        inner.drain(..n);
        Ok(n)
    }
}

#[derive(Default)]
struct State {
    screen: String,
    transcript: String,
    transcripting: bool,
    lines: VecDeque<ReadLineResult>,
    keys: VecDeque<char>,
    save_file: Option<SharedBuffer>,
    restore_file: Option<SharedBuffer>,
    aux_file: Option<SharedBuffer>,
    command_file: Option<SharedBuffer>,
}

/// Scriptable backend: queue input up front, inspect output afterward.
///
/// File openers return `None` (user declined) unless a buffer was provided
/// with the `provide_*` methods.
pub struct HeadlessIo {
    state: Mutex<State>,
    timed_input: bool,
    /// Simulated think time before a queued read resolves.
    read_delay: Duration,
    /// Delay between the interrupt callback requesting cancellation and the
    /// backend honoring it, to model a slow-to-cooperate backend.
    cancel_lag: Duration,
    reads_started: AtomicUsize,
}

impl HeadlessIo {
    pub fn new() -> Self {
        HeadlessIo {
            state: Mutex::new(State::default()),
            timed_input: true,
            read_delay: Duration::ZERO,
            cancel_lag: Duration::ZERO,
            reads_started: AtomicUsize::new(0),
        }
    }

    pub fn with_timed_input(mut self, on: bool) -> Self {
        self.timed_input = on;
        self
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn with_cancel_lag(mut self, lag: Duration) -> Self {
        self.cancel_lag = lag;
        self
    }

    /// Queue a line terminated by the enter key.
    pub fn queue_line(&self, text: &str) {
        self.lock().lines.push_back(ReadLineResult::line(text));
    }

    /// Queue an arbitrary read outcome.
    pub fn queue_result(&self, result: ReadLineResult) {
        self.lock().lines.push_back(result);
    }

    pub fn queue_key(&self, ch: char) {
        self.lock().keys.push_back(ch);
    }

    pub fn screen(&self) -> String {
        self.lock().screen.clone()
    }

    pub fn transcript(&self) -> String {
        self.lock().transcript.clone()
    }

    /// How many read_line/read_key calls actually reached the backend.
    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::Acquire)
    }

    pub fn provide_save_file(&self) -> SharedBuffer {
        let buf = SharedBuffer::new();
        self.lock().save_file = Some(buf.clone());
        buf
    }

    pub fn provide_restore_file(&self) -> SharedBuffer {
        let buf = SharedBuffer::new();
        self.lock().restore_file = Some(buf.clone());
        buf
    }

    pub fn provide_auxiliary_file(&self) -> SharedBuffer {
        let buf = SharedBuffer::new();
        self.lock().aux_file = Some(buf.clone());
        buf
    }

    pub fn provide_command_file(&self) -> SharedBuffer {
        let buf = SharedBuffer::new();
        self.lock().command_file = Some(buf.clone());
        buf
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Wait out `read_delay`, polling the interrupt callback when timed
    /// input is on. Returns true if the read was cancelled.
    fn wait(&self, interval_tenths: u16, interrupt: InterruptFn<'_>) -> bool {
        let deadline = Instant::now() + self.read_delay;
        loop {
            if self.timed_input && interval_tenths > 0 {
                if let InputInterrupt::Cancel = interrupt() {
                    std::thread::sleep(self.cancel_lag);
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Default for HeadlessIo {
    fn default() -> Self {
        HeadlessIo::new()
    }
}

impl IoBackend for HeadlessIo {
    fn read_line(
        &self,
        _initial: &str,
        interval_tenths: u16,
        interrupt: InterruptFn<'_>,
        _terminating_keys: &[u8],
        _allow_debugger_break: bool,
    ) -> ReadLineResult {
        self.reads_started.fetch_add(1, Ordering::AcqRel);
        if self.wait(interval_tenths, interrupt) {
            return ReadLineResult::Cancelled;
        }
        self.lock()
            .lines
            .pop_front()
            .unwrap_or_else(|| ReadLineResult::line(""))
    }

    fn read_key(
        &self,
        interval_tenths: u16,
        interrupt: InterruptFn<'_>,
        translator: KeyTranslator<'_>,
    ) -> i16 {
        self.reads_started.fetch_add(1, Ordering::AcqRel);
        if self.wait(interval_tenths, interrupt) {
            return 0;
        }
        match self.lock().keys.pop_front() {
            Some(ch) => translator(ch),
            None => 13, // enter
        }
    }

    fn timed_input_available(&self) -> bool {
        self.timed_input
    }

    fn put_char(&self, ch: char) {
        self.lock().screen.push(ch);
    }

    fn put_string(&self, s: &str) {
        self.lock().screen.push_str(s);
    }

    fn transcripting(&self) -> bool {
        self.lock().transcripting
    }

    fn set_transcripting(&self, enabled: bool) {
        self.lock().transcripting = enabled;
    }

    fn put_transcript_char(&self, ch: char) {
        self.lock().transcript.push(ch);
    }

    fn put_transcript_string(&self, s: &str) {
        self.lock().transcript.push_str(s);
    }

    fn open_save_file(&self, _size: usize) -> Option<BackendFile> {
        self.lock()
            .save_file
            .clone()
            .map(|b| Box::new(b) as BackendFile)
    }

    fn open_restore_file(&self) -> Option<BackendFile> {
        self.lock()
            .restore_file
            .clone()
            .map(|b| Box::new(b) as BackendFile)
    }

    fn open_auxiliary_file(&self, _name: &str, _size: usize, _writing: bool) -> Option<BackendFile> {
        self.lock()
            .aux_file
            .clone()
            .map(|b| Box::new(b) as BackendFile)
    }

    fn open_command_file(&self, _writing: bool) -> Option<BackendFile> {
        self.lock()
            .command_file
            .clone()
            .map(|b| Box::new(b) as BackendFile)
    }
}

// Poisoning only happens if a test panicked mid-write; the data is still
// the best we have.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
