//! fleetprobe - host availability checks and remote execution over SSH
//!
//! Core library for finding which hosts of a fleet are reachable, log-in-able,
//! correctly identified and idle, then running commands and moving files on
//! them.

// Public modules
pub mod constants;
pub mod core;
pub mod logger;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod platform;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    deploy, deploy_with, execute, get_availability, get_available_hosts, AvailabilityConfig,
    Notifier, NotifyLevel, ProbeContext, Transport, TracingNotifier,
};
pub use models::{AvailabilityRecord, Credential, ExecutionResult, HostDescriptor, Interface};
pub use platform::{SshConfig, SshTransport};
pub use utils::{ErrorKind, FleetError, Result};
