//! # Domain Models
//!
//! Data structures describing the host catalog and the results produced by
//! availability checks and remote execution.
//!
//! ## Catalog
//!
//! A [`HostDescriptor`] lists every network [`Interface`] a host may be reached
//! on and every [`Credential`] that may log into it. Any credential may be
//! tried against any interface; the availability pipeline picks the first one
//! that works per interface.
//!
//! Credentials reference private key files by path. Key material is never
//! read into these types.

pub mod host;

pub use host::{
    AvailabilityRecord, Credential, ExecutionResult, HostDescriptor, Interface, Username,
};
