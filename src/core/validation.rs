//! Host identity validation
//!
//! Confirms the machine behind an interface is the one the catalog describes:
//! architecture and OS from `uname -om`, then an optional device id command.

use super::executor::execute;
use super::session::Transport;
use crate::constants::IDENTITY_COMMAND;
use crate::models::{Credential, Interface};
use crate::utils::{FleetError, IdentityField, IdentityMismatches, Result};

/// Check that the remote `uname -om` output contains both `expected_arch`
/// and `expected_os`.
///
/// Both fields are checked independently; every mismatch is reported in one
/// `FleetError::IdentityMismatch`.
///
/// # Arguments
/// * `expected_arch` - e.g. `"x86_64"`, `"armv7l"`
/// * `expected_os` - e.g. `"GNU/Linux"`
pub async fn validate_identity(
    transport: &dyn Transport,
    interface: &Interface,
    credential: &Credential,
    expected_arch: &str,
    expected_os: &str,
) -> Result<()> {
    let result = execute(transport, &[IDENTITY_COMMAND], interface, credential, None, None).await?;
    let output = format!("{}{}", result.stdout, result.stderr);

    let mut mismatches = Vec::new();
    if !output.contains(expected_arch) {
        mismatches.push(IdentityField::Architecture {
            expected: expected_arch.to_string(),
        });
    }
    if !output.contains(expected_os) {
        mismatches.push(IdentityField::Os {
            expected: expected_os.to_string(),
        });
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(FleetError::IdentityMismatch {
            address: interface.address.clone(),
            mismatches: IdentityMismatches(mismatches),
            output: output.trim().to_string(),
        })
    }
}

/// Run `device_id_command` and check its output contains `device_id`
pub async fn validate_device_id(
    transport: &dyn Transport,
    interface: &Interface,
    credential: &Credential,
    device_id: &str,
    device_id_command: &str,
) -> Result<()> {
    let result = execute(transport, &[device_id_command], interface, credential, None, None).await?;

    if result.stdout.contains(device_id) {
        Ok(())
    } else {
        Err(FleetError::DeviceIdMismatch {
            address: interface.address.clone(),
            expected: device_id.to_string(),
            output: result.stdout.trim().to_string(),
        })
    }
}
