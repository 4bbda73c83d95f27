//! Interface-level reachability check

use super::session::Transport;
use crate::utils::{FleetError, Result};

/// Fail with `FleetError::Unreachable` unless `address` answers a single ping.
///
/// Transport errors while pinging count as unreachable.
pub async fn probe(transport: &dyn Transport, address: &str) -> Result<()> {
    match transport.ping(address).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(FleetError::Unreachable {
            address: address.to_string(),
        }),
        Err(e) => {
            tracing::debug!("ping {} failed: {}", address, e);
            Err(FleetError::Unreachable {
                address: address.to_string(),
            })
        }
    }
}
