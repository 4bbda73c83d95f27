//! Idleness check: is the host already running a tracked workload?

use super::executor::execute;
use super::session::Transport;
use crate::constants::PROCESS_LOOKUP_PREFIX;
use crate::models::{Credential, Interface};
use crate::utils::{FleetError, Result};
use futures::future::try_join_all;

/// Look up `process_name` in the remote process list.
///
/// Returns the first output line mentioning the process, or `None` when it
/// is not running.
pub async fn find_process(
    transport: &dyn Transport,
    interface: &Interface,
    credential: &Credential,
    process_name: &str,
) -> Result<Option<String>> {
    let command = format!("{PROCESS_LOOKUP_PREFIX}{process_name}");
    let result = execute(transport, &[command], interface, credential, None, None).await?;

    Ok(result
        .stdout
        .lines()
        .map(str::trim)
        .find(|line| line.contains(process_name))
        .map(str::to_string))
}

/// Fail with `FleetError::HostBusy` if any of `tracked_processes` is running.
///
/// One lookup per process name, all issued concurrently. A failed lookup
/// fails the whole check.
pub async fn check_free<S: AsRef<str>>(
    transport: &dyn Transport,
    interface: &Interface,
    credential: &Credential,
    tracked_processes: &[S],
) -> Result<()> {
    let lookups = tracked_processes.iter().map(|name| async move {
        let name = name.as_ref();
        find_process(transport, interface, credential, name)
            .await
            .map(|found| found.map(|_| name.to_string()))
    });

    let running: Vec<String> = try_join_all(lookups).await?.into_iter().flatten().collect();

    if running.is_empty() {
        Ok(())
    } else {
        Err(FleetError::HostBusy {
            address: interface.address.clone(),
            processes: running,
        })
    }
}
