//! # Utilities Module
//!
//! Cross-cutting concerns shared by the `core` and `platform` modules.
//!
//! - [`errors`]: Typed error hierarchy using `thiserror`
//!
//! Error types live here to avoid circular dependencies between `core` and
//! `platform`. Every fallible operation in the crate returns [`Result`].

pub mod errors;

pub use errors::{
    ErrorKind, FleetError, IdentityField, IdentityMismatches, Result, StreamKind,
    TransferDirection,
};
