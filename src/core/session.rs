//! Remote transport abstraction for SSH sessions, reachability and file copy
//!
//! This trait allows testing without real hosts by supporting mock implementations.
//! The SSH implementation is in `src/platform/ssh.rs`.

use crate::constants::{DEFAULT_PTY_COLS, DEFAULT_PTY_ROWS, DEFAULT_PTY_TERM};
use crate::models::{Credential, Interface};
use crate::utils::Result;
use std::path::Path;
use tokio::sync::mpsc;

/// Pseudo-terminal request for interactive sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyOptions {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
}

impl Default for PtyOptions {
    fn default() -> Self {
        Self {
            term: DEFAULT_PTY_TERM.to_string(),
            cols: DEFAULT_PTY_COLS,
            rows: DEFAULT_PTY_ROWS,
        }
    }
}

/// One event observed on an open session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Stdout(String),
    Stderr(String),
    /// Final event of every session
    Closed {
        exit_code: i32,
        signal: Option<String>,
    },
}

/// Receiving half of an open session.
///
/// Dropping the stream (or calling [`SessionStream::terminate`]) tears the
/// session down: the producer notices the closed channel on its next send and
/// disconnects.
#[derive(Debug)]
pub struct SessionStream {
    rx: mpsc::Receiver<SessionEvent>,
}

impl SessionStream {
    pub fn new(rx: mpsc::Receiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/stream pair
    pub fn channel(buffer: usize) -> (mpsc::Sender<SessionEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx))
    }

    /// Next event, or `None` once the producer has gone away
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// End the session immediately, discarding anything still in flight
    pub fn terminate(mut self) {
        self.rx.close();
    }
}

/// Networked operations the core consumes.
///
/// Every call opens and tears down its own connection; nothing is pooled.
/// Implementations must be safe to call concurrently.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Single network-layer reachability check
    async fn ping(&self, address: &str) -> Result<bool>;

    /// Run `batch` as one exec request, optionally on a pty.
    ///
    /// Connection and authentication failures are returned as
    /// `FleetError::Connection`, channel/exec failures as
    /// `FleetError::ExecSetup`, both before any event is produced.
    async fn exec(
        &self,
        interface: &Interface,
        credential: &Credential,
        batch: &str,
        pty: Option<PtyOptions>,
    ) -> Result<SessionStream>;

    /// Open an interactive shell, write `input` to it and close its input
    async fn shell(
        &self,
        interface: &Interface,
        credential: &Credential,
        input: &str,
    ) -> Result<SessionStream>;

    /// Copy a local file or directory onto the host
    async fn copy_to_host(
        &self,
        local: &Path,
        remote: &str,
        interface: &Interface,
        credential: &Credential,
    ) -> Result<()>;

    /// Copy a remote file or directory to the local machine
    async fn copy_from_host(
        &self,
        remote: &str,
        local: &Path,
        interface: &Interface,
        credential: &Credential,
    ) -> Result<()>;
}
