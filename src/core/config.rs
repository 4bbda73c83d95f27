//! Caller-supplied configuration for availability checks
//!
//! There is no process-wide state: each availability call receives a
//! [`ProbeContext`] bundling the transport, the notifier and the config.

use super::notifier::Notifier;
use super::session::Transport;
use crate::constants::DEFAULT_TRACKED_PROCESSES;
use crate::utils::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the availability cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Process names that mark a host as busy
    pub tracked_processes: Vec<String>,
    /// Run each host's device id command as part of the cascade
    pub check_device_id: bool,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            tracked_processes: DEFAULT_TRACKED_PROCESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            check_device_id: true,
        }
    }
}

impl AvailabilityConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw)
            .map_err(|e| FleetError::Catalog(format!("failed to parse config: {e}")))?;
        config.tracked_processes =
            crate::normalize::normalize_process_names(config.tracked_processes.as_slice())?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Everything an availability check depends on, passed explicitly
#[derive(Clone, Copy)]
pub struct ProbeContext<'a> {
    pub transport: &'a dyn Transport,
    pub notifier: &'a dyn Notifier,
    pub config: &'a AvailabilityConfig,
}

impl<'a> ProbeContext<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        notifier: &'a dyn Notifier,
        config: &'a AvailabilityConfig,
    ) -> Self {
        Self {
            transport,
            notifier,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tracked_processes() {
        let config = AvailabilityConfig::default();
        assert_eq!(
            config.tracked_processes,
            vec!["catkin_make", "node_main", "roscore"]
        );
        assert!(config.check_device_id);
    }

    #[test]
    fn test_from_json_overrides_and_normalizes() {
        let config = AvailabilityConfig::from_json_str(
            r#"{"tracked_processes": [" gazebo ", "gazebo", "", "rosmaster"]}"#,
        )
        .unwrap();
        assert_eq!(config.tracked_processes, vec!["gazebo", "rosmaster"]);
        assert!(config.check_device_id);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = AvailabilityConfig::from_json_str("not json").unwrap_err();
        assert_eq!(err.kind(), crate::utils::ErrorKind::Catalog);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.json");
        std::fs::write(&path, r#"{"check_device_id": false}"#).unwrap();

        let config = AvailabilityConfig::from_path(&path).unwrap();
        assert!(!config.check_device_id);
        assert_eq!(config.tracked_processes.len(), 3);
    }
}
