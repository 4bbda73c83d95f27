//! Core business logic (transport-agnostic)
//!
//! CRITICAL: This module MUST NOT import `platform`. Everything networked goes
//! through the [`Transport`] trait so the cascade can run against a scripted
//! transport in tests.

pub mod availability;
pub mod busy;
pub mod config;
pub mod credential;
pub mod deployer;
pub mod executor;
pub mod notifier;
pub mod prober;
pub mod session;
pub mod validation;

// Scripted transport (tests only)
#[cfg(test)]
pub mod mock_transport;

pub use availability::{get_availability, get_available_hosts};
pub use busy::{check_free, find_process};
pub use config::{AvailabilityConfig, ProbeContext};
pub use credential::{race_credentials, test_ssh};
pub use deployer::{deploy, deploy_with};
pub use executor::{
    execute, execute_with, ChunkCallback, EchoStripper, ExecOptions, OutputFilter, PassThrough,
};
pub use notifier::{CollectingNotifier, Notifier, NotifyLevel, TracingNotifier};
pub use prober::probe;
pub use session::{PtyOptions, SessionEvent, SessionStream, Transport};
pub use validation::{validate_device_id, validate_identity};
