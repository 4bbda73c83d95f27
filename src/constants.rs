//! # Crate-Wide Constants
//!
//! Centralized defaults and magic values used throughout fleetprobe.
//!
//! ```rust
//! use fleetprobe::constants::*;
//!
//! assert_eq!(DEFAULT_SSH_PORT, 22);
//! ```

// ============================================================================
// Session protocol
// ============================================================================

/// Exit code of an [`ExecutionResult`](crate::models::ExecutionResult) whose
/// session has not closed yet
pub const EXIT_CODE_PENDING: i32 = -1;

/// Appended to every command batch so the remote shell terminates
pub const SESSION_EXIT_COMMAND: &str = "exit";

/// Trivial command used to confirm a credential can log in
pub const SSH_CHECK_COMMAND: &str = "echo \"hello\"";

/// Prints machine hardware name and operating system
pub const IDENTITY_COMMAND: &str = "uname -om";

/// Prefix of the process lookup pipeline; the process name is appended
pub const PROCESS_LOOKUP_PREFIX: &str = "ps aux | grep -v grep | grep ";

/// Processes that mark a host as already running a tracked workload
pub const DEFAULT_TRACKED_PROCESSES: &[&str] = &["catkin_make", "node_main", "roscore"];

// ============================================================================
// SSH transport
// ============================================================================

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Setup timeout for SSH sessions (seconds)
///
/// Covers TCP connect, handshake and authentication. Command execution has
/// no deadline.
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Terminal type requested for pty-backed sessions
pub const DEFAULT_PTY_TERM: &str = "vt100";

/// Default pty width (columns)
pub const DEFAULT_PTY_COLS: u32 = 80;

/// Default pty height (rows)
pub const DEFAULT_PTY_ROWS: u32 = 24;

/// Sleep between non-blocking channel polls when no data is pending (ms)
pub const SESSION_POLL_INTERVAL_MS: u64 = 10;

/// Buffered session events before the reader thread blocks
pub const SESSION_EVENT_BUFFER: usize = 64;

/// Ping wait for a single echo reply (seconds)
pub const PING_TIMEOUT_SECS: u64 = 2;

// ============================================================================
// Transfer
// ============================================================================

/// Upper bound on one archive download (seconds)
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Used when a download URL has no usable last path segment
pub const FALLBACK_ARCHIVE_NAME: &str = "archive.zip";

// ============================================================================
// Logging
// ============================================================================

/// Environment variable holding a `tracing` filter directive
pub const LOG_FILTER_ENV: &str = "FLEETPROBE_LOG";

/// Set to `1` to raise the default log level to debug
pub const LOG_VERBOSE_ENV: &str = "FLEETPROBE_LOG_VERBOSE";
