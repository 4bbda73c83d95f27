//! Platform implementations of the core traits
//!
//! All code touching real sockets, SSH sessions and system binaries is
//! isolated here.

pub mod ssh;

pub use ssh::{SshConfig, SshTransport};
