//! Availability aggregation
//!
//! Runs the validation cascade (reachability, credential race, identity,
//! device id, idleness) for every interface of every host concurrently.
//! Stages of one interface run strictly in order and the first failure ends
//! that interface's pipeline. Failures are reported through the notifier and
//! never abort sibling interfaces or hosts.

use super::busy::check_free;
use super::config::ProbeContext;
use super::credential::race_credentials;
use super::notifier::NotifyLevel;
use super::prober::probe;
use super::validation::{validate_device_id, validate_identity};
use crate::models::{AvailabilityRecord, HostDescriptor, Interface};
use crate::utils::Result;
use futures::future::join_all;
use std::collections::HashSet;

async fn validate_interface(
    ctx: ProbeContext<'_>,
    host: &HostDescriptor,
    interface: &Interface,
    check_busy: bool,
) -> Result<AvailabilityRecord> {
    let address = interface.address.as_str();

    probe(ctx.transport, address).await?;

    let credential =
        race_credentials(ctx.transport, ctx.notifier, interface, &host.credentials).await?;
    ctx.notifier.notify(
        NotifyLevel::Info,
        &format!("{} got valid user: {}", address, credential.username()),
    );

    validate_identity(
        ctx.transport,
        interface,
        &credential,
        &host.architecture,
        &host.os,
    )
    .await?;

    if ctx.config.check_device_id && !host.device_id_command.trim().is_empty() {
        validate_device_id(
            ctx.transport,
            interface,
            &credential,
            &host.device_id,
            &host.device_id_command,
        )
        .await?;
    }

    if check_busy {
        check_free(
            ctx.transport,
            interface,
            &credential,
            &ctx.config.tracked_processes,
        )
        .await?;
    }

    ctx.notifier.notify(
        NotifyLevel::Info,
        &format!("returning valid host on {}", address),
    );

    Ok(AvailabilityRecord {
        host: host.clone(),
        interface: interface.clone(),
        credential,
    })
}

/// Validate every interface of `host` and return one record per interface
/// that passes the whole cascade.
///
/// Interfaces listed more than once are checked once. Per-interface failures
/// are notified at warning level as `Host <deviceId>+<arch>: <error>`.
pub async fn get_availability(
    ctx: ProbeContext<'_>,
    host: &HostDescriptor,
    check_busy: bool,
) -> Vec<AvailabilityRecord> {
    let mut seen = HashSet::new();
    let interfaces: Vec<&Interface> = host
        .interfaces
        .iter()
        .filter(|intf| seen.insert(intf.address.as_str()))
        .collect();

    let device_type = host.device_type();
    tracing::debug!(
        "checking {} interface(s) of {}",
        interfaces.len(),
        device_type
    );

    let outcomes = join_all(
        interfaces
            .into_iter()
            .map(|interface| validate_interface(ctx, host, interface, check_busy)),
    )
    .await;

    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(record) => Some(record),
            Err(e) => {
                ctx.notifier.notify(
                    NotifyLevel::Warning,
                    &format!("Host {}: {}", device_type, e),
                );
                None
            }
        })
        .collect()
}

/// Run [`get_availability`] for all `hosts` concurrently and flatten the
/// records.
///
/// No order among hosts is guaranteed. A (device type, address) pair yields
/// at most one record even if a host is listed twice.
pub async fn get_available_hosts(
    ctx: ProbeContext<'_>,
    hosts: &[HostDescriptor],
    check_busy: bool,
) -> Vec<AvailabilityRecord> {
    let per_host = join_all(
        hosts
            .iter()
            .map(|host| get_availability(ctx, host, check_busy)),
    )
    .await;

    let mut seen = HashSet::new();
    let records: Vec<AvailabilityRecord> = per_host
        .into_iter()
        .flatten()
        .filter(|record| {
            seen.insert((record.host.device_type(), record.interface.address.clone()))
        })
        .collect();

    tracing::info!(
        "{} available interface(s) across {} host(s)",
        records.len(),
        hosts.len()
    );

    records
}
