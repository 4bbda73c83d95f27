//! Credential race: find a login that works on an interface
//!
//! Every candidate credential is tried at once. The first one whose trivial
//! command completes wins; the remaining attempts are dropped, which cancels
//! them at their next suspension point.

use super::executor::execute;
use super::notifier::{Notifier, NotifyLevel};
use super::session::Transport;
use crate::constants::SSH_CHECK_COMMAND;
use crate::models::{Credential, Interface};
use crate::utils::{FleetError, Result};
use futures::future::select_ok;

/// Confirm `credential` can open a session on `interface` and run a trivial
/// command. The command's exit code is not inspected.
pub async fn test_ssh(
    transport: &dyn Transport,
    interface: &Interface,
    credential: &Credential,
) -> Result<()> {
    execute(transport, &[SSH_CHECK_COMMAND], interface, credential, None, None).await?;
    Ok(())
}

/// Race all `credentials` against `interface` and return the first that works.
///
/// Fails with `FleetError::NoCredential` when the list is empty or every
/// attempt fails.
pub async fn race_credentials(
    transport: &dyn Transport,
    notifier: &dyn Notifier,
    interface: &Interface,
    credentials: &[Credential],
) -> Result<Credential> {
    if credentials.is_empty() {
        return Err(FleetError::NoCredential {
            address: interface.address.clone(),
            tried: 0,
            last_error: "no credentials configured".to_string(),
        });
    }

    let attempts = credentials.iter().map(|credential| {
        Box::pin(async move {
            notifier.notify(
                NotifyLevel::Info,
                &format!("testing {} on {}", credential.username(), interface.address),
            );
            test_ssh(transport, interface, credential)
                .await
                .map(|_| credential.clone())
                .map_err(|e| {
                    format!(
                        "{}@{} not SSH-able: {}",
                        credential.username(),
                        interface.address,
                        e
                    )
                })
        })
    });

    match select_ok(attempts).await {
        Ok((credential, _losers)) => Ok(credential),
        Err(last_error) => Err(FleetError::NoCredential {
            address: interface.address.clone(),
            tried: credentials.len(),
            last_error,
        }),
    }
}
