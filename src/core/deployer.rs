//! Deployment over an interactive shell session
//!
//! Unlike [`execute`](super::executor::execute), any stderr output ends the
//! session immediately and fails the call with the offending chunk.

use super::executor::{command_batch, submitted_commands, EchoStripper, OutputFilter};
use super::session::{SessionEvent, Transport};
use crate::models::{Credential, ExecutionResult, Interface};
use crate::utils::{FleetError, Result};

/// Write `commands` (plus a trailing `exit`) to a fresh shell on the host,
/// close its input and wait for the session to end.
///
/// Shell echo and prompts are removed with [`EchoStripper`].
pub async fn deploy<S: AsRef<str>>(
    transport: &dyn Transport,
    commands: &[S],
    interface: &Interface,
    credential: &Credential,
) -> Result<ExecutionResult> {
    deploy_with(transport, commands, interface, credential, &EchoStripper).await
}

/// [`deploy`] with a caller-chosen stdout filter.
pub async fn deploy_with<S: AsRef<str>>(
    transport: &dyn Transport,
    commands: &[S],
    interface: &Interface,
    credential: &Credential,
    filter: &dyn OutputFilter,
) -> Result<ExecutionResult> {
    let submitted = submitted_commands(commands);
    let batch = command_batch(commands);

    tracing::info!(
        "deploying {} command(s) to {}@{}",
        submitted.len(),
        credential.username(),
        interface.address
    );

    let mut stream = transport.shell(interface, credential, &batch).await?;
    let pending = ExecutionResult::pending(credential.clone(), interface.address.clone());
    let mut stdout = String::new();

    while let Some(event) = stream.next_event().await {
        match event {
            SessionEvent::Stdout(chunk) => stdout.push_str(&chunk),
            SessionEvent::Stderr(chunk) => {
                tracing::warn!("deployment on {} wrote to stderr", interface.address);
                stream.terminate();
                return Err(FleetError::RemoteStderr {
                    address: interface.address.clone(),
                    chunk,
                });
            }
            SessionEvent::Closed { exit_code, signal } => {
                let cleaned = filter.clean(&stdout, credential.username().as_str(), &submitted);
                return Ok(pending.complete(exit_code, signal, cleaned, String::new()));
            }
        }
    }

    Err(FleetError::Connection {
        address: interface.address.clone(),
        username: credential.username().to_string(),
        reason: "shell ended without an exit status".to_string(),
    })
}
