//! Error types for fleetprobe
//!
//! All error types use thiserror. Every variant carries structured detail so
//! callers can branch on [`FleetError::kind`] instead of parsing messages.

use std::fmt;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, FleetError>;

/// Which output stream a chunk arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Direction of a file copy relative to the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    ToHost,
    FromHost,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::ToHost => write!(f, "to"),
            TransferDirection::FromHost => write!(f, "from"),
        }
    }
}

/// A single identity field that did not match the host catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityField {
    Architecture { expected: String },
    Os { expected: String },
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityField::Architecture { expected } => {
                write!(f, "architecture (expected {expected})")
            }
            IdentityField::Os { expected } => write!(f, "OS (expected {expected})"),
        }
    }
}

/// All identity fields that mismatched in one check, reported together
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityMismatches(pub Vec<IdentityField>);

impl IdentityMismatches {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn architecture(&self) -> bool {
        self.0
            .iter()
            .any(|f| matches!(f, IdentityField::Architecture { .. }))
    }

    pub fn os(&self) -> bool {
        self.0.iter().any(|f| matches!(f, IdentityField::Os { .. }))
    }
}

impl fmt::Display for IdentityMismatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " and ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

/// Discriminant of [`FleetError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unreachable,
    NoCredential,
    IdentityMismatch,
    DeviceIdMismatch,
    HostBusy,
    Connection,
    ExecSetup,
    AbortedByCallback,
    RemoteStderr,
    Transfer,
    Download,
    Extract,
    Catalog,
    Io,
}

/// Top-level error type for availability checks and remote operations
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("{address} is not reachable")]
    Unreachable { address: String },

    #[error("no usable credential for {address} ({tried} tried): {last_error}")]
    NoCredential {
        address: String,
        tried: usize,
        last_error: String,
    },

    #[error("host {address} has incorrect {mismatches}: {output}")]
    IdentityMismatch {
        address: String,
        mismatches: IdentityMismatches,
        output: String,
    },

    #[error("host {address} has incorrect device id (expected {expected}): {output}")]
    DeviceIdMismatch {
        address: String,
        expected: String,
        output: String,
    },

    #[error("{address} is already running: {}", .processes.join(", "))]
    HostBusy {
        address: String,
        processes: Vec<String>,
    },

    #[error("couldn't connect to {username}@{address}: {reason}")]
    Connection {
        address: String,
        username: String,
        reason: String,
    },

    #[error("exec setup on {address} failed: {reason}")]
    ExecSetup { address: String, reason: String },

    #[error("session on {address} aborted by {stream} callback on chunk: {chunk}")]
    AbortedByCallback {
        address: String,
        stream: StreamKind,
        chunk: String,
    },

    #[error("deployment on {address} wrote to stderr: {chunk}")]
    RemoteStderr { address: String, chunk: String },

    #[error("copy {direction} {address} failed: {reason}")]
    Transfer {
        address: String,
        direction: TransferDirection,
        reason: String,
    },

    #[error("couldn't download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("couldn't extract {archive}: {reason}")]
    Extract { archive: String, reason: String },

    #[error("invalid host catalog: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FleetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::Unreachable { .. } => ErrorKind::Unreachable,
            FleetError::NoCredential { .. } => ErrorKind::NoCredential,
            FleetError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            FleetError::DeviceIdMismatch { .. } => ErrorKind::DeviceIdMismatch,
            FleetError::HostBusy { .. } => ErrorKind::HostBusy,
            FleetError::Connection { .. } => ErrorKind::Connection,
            FleetError::ExecSetup { .. } => ErrorKind::ExecSetup,
            FleetError::AbortedByCallback { .. } => ErrorKind::AbortedByCallback,
            FleetError::RemoteStderr { .. } => ErrorKind::RemoteStderr,
            FleetError::Transfer { .. } => ErrorKind::Transfer,
            FleetError::Download { .. } => ErrorKind::Download,
            FleetError::Extract { .. } => ErrorKind::Extract,
            FleetError::Catalog(_) => ErrorKind::Catalog,
            FleetError::Io(_) => ErrorKind::Io,
        }
    }
}
