//! Input normalisation helpers for host catalogs and tracked process names.
//!
//! Every catalog passes through [`normalize_catalog`] before it reaches the
//! availability pipeline, so addresses are trimmed and interfaces and
//! credentials are unique per host.

use crate::models::HostDescriptor;
use crate::utils::{FleetError, Result};
use std::collections::HashSet;
use std::path::Path;

/// Normalise a tracked process name.
///
/// Trims whitespace, enforces a 64-character limit and validates allowed
/// characters (`A-Z a-z 0-9 - _ .`). The name ends up inside a remote `grep`
/// pipeline, so anything else is rejected.
pub fn normalize_process_name(raw: &str) -> Result<String> {
    const MAX_LEN: usize = 64;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FleetError::Catalog(
            "process name cannot be empty".to_string(),
        ));
    }

    if trimmed.len() > MAX_LEN {
        return Err(FleetError::Catalog(format!(
            "process name '{}' exceeds {} characters",
            trimmed, MAX_LEN
        )));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(FleetError::Catalog(format!(
            "process name '{}' contains invalid characters (allowed: A-Z, a-z, 0-9, '-', '_', '.')",
            trimmed
        )));
    }

    Ok(trimmed.to_string())
}

/// Normalise a list of process names: skip blanks, validate, deduplicate
/// keeping first occurrence order.
pub fn normalize_process_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();
    for name in names {
        if name.as_ref().trim().is_empty() {
            continue;
        }
        let normalized = normalize_process_name(name.as_ref())?;
        if seen.insert(normalized.clone()) {
            cleaned.push(normalized);
        }
    }
    Ok(cleaned)
}

/// Normalise one host entry.
///
/// Trims identity fields and addresses, drops blank and duplicate interfaces
/// and duplicate credentials (first occurrence wins). A host without a device
/// id is rejected.
pub fn normalize_host(mut host: HostDescriptor) -> Result<HostDescriptor> {
    host.device_id = host.device_id.trim().to_string();
    if host.device_id.is_empty() {
        return Err(FleetError::Catalog("device id cannot be empty".to_string()));
    }
    host.architecture = host.architecture.trim().to_string();
    host.os = host.os.trim().to_string();
    host.device_id_command = host.device_id_command.trim().to_string();

    let mut seen_addresses = HashSet::new();
    host.interfaces = host
        .interfaces
        .into_iter()
        .map(|mut intf| {
            intf.address = intf.address.trim().to_string();
            intf
        })
        .filter(|intf| !intf.address.is_empty() && seen_addresses.insert(intf.address.clone()))
        .collect();

    let mut seen_credentials = HashSet::new();
    host.credentials.retain(|cred| seen_credentials.insert(cred.clone()));

    Ok(host)
}

/// Normalise every host of a catalog
pub fn normalize_catalog(hosts: Vec<HostDescriptor>) -> Result<Vec<HostDescriptor>> {
    hosts.into_iter().map(normalize_host).collect()
}

/// Parse and normalise a JSON host catalog (an array of hosts)
pub fn parse_catalog(raw: &str) -> Result<Vec<HostDescriptor>> {
    let hosts: Vec<HostDescriptor> = serde_json::from_str(raw)
        .map_err(|e| FleetError::Catalog(format!("failed to parse catalog: {e}")))?;
    normalize_catalog(hosts)
}

/// Read, parse and normalise a JSON host catalog file
pub fn load_catalog(path: &Path) -> Result<Vec<HostDescriptor>> {
    let raw = std::fs::read_to_string(path)?;
    let hosts = parse_catalog(&raw)?;
    tracing::debug!("loaded {} hosts from {}", hosts.len(), path.display());
    Ok(hosts)
}
