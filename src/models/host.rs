//! Host catalog and result types
//!
//! The serde field names follow the on-disk catalog format (`"Device ID"`,
//! `"Interface_list"`, `"Users"`, ...) so existing catalogs load unchanged.

use crate::constants::EXIT_CODE_PENDING;
use crate::utils::FleetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// SSH login name
///
/// Valid usernames are non-empty, at most 256 bytes, and contain no
/// whitespace or `@` (the prompt matcher splits on `@`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a new username after validation
    pub fn new(username: impl Into<String>) -> Result<Self, FleetError> {
        let username = username.into();

        if username.is_empty() {
            return Err(FleetError::Catalog("username cannot be empty".to_string()));
        }

        if username.len() > 256 {
            return Err(FleetError::Catalog(
                "username exceeds maximum length (256)".to_string(),
            ));
        }

        if username.chars().any(|c| c.is_whitespace() || c == '@') {
            return Err(FleetError::Catalog(format!(
                "username '{username}' contains whitespace or '@'"
            )));
        }

        Ok(Username(username))
    }

    /// Get the username as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = FleetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Username::new(value.trim())
    }
}

impl TryFrom<&str> for Username {
    type Error = FleetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Username::new(value.trim())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

/// A login that may be tried against any interface of a host
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "name")]
    username: Username,
    /// Path to the private key
    #[serde(rename = "Key")]
    key_path: PathBuf,
}

impl Credential {
    pub fn new(username: Username, key_path: impl Into<PathBuf>) -> Self {
        Credential {
            username,
            key_path: key_path.into(),
        }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

/// One network interface of a host
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interface {
    #[serde(rename = "IP")]
    pub address: String,
}

impl Interface {
    pub fn new(address: impl Into<String>) -> Self {
        Interface {
            address: address.into(),
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// A candidate compute host from the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDescriptor {
    #[serde(rename = "Device ID")]
    pub device_id: String,
    #[serde(rename = "Architecture")]
    pub architecture: String,
    #[serde(rename = "OS")]
    pub os: String,
    /// Command whose output must contain `device_id`; empty disables the check
    #[serde(rename = "Device ID Command", default)]
    pub device_id_command: String,
    #[serde(rename = "Interface_list", default)]
    pub interfaces: Vec<Interface>,
    #[serde(rename = "Users", default)]
    pub credentials: Vec<Credential>,
}

impl HostDescriptor {
    /// Key identifying the kind of device, `"<device id>+<architecture>"`
    pub fn device_type(&self) -> String {
        format!("{}+{}", self.device_id, self.architecture)
    }
}

/// A host interface confirmed reachable, authenticated, identity-matched and
/// (optionally) idle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailabilityRecord {
    pub host: HostDescriptor,
    pub interface: Interface,
    pub credential: Credential,
}

/// Outcome of one remote execution or deployment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub credential: Credential,
    pub address: String,
    /// [`EXIT_CODE_PENDING`] until the session closes
    pub exit_code: i32,
    pub signal: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn pending(credential: Credential, address: impl Into<String>) -> Self {
        ExecutionResult {
            credential,
            address: address.into(),
            exit_code: EXIT_CODE_PENDING,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Record the close event. Consumes the pending result so it can only
    /// happen once.
    pub fn complete(
        self,
        exit_code: i32,
        signal: Option<String>,
        stdout: String,
        stderr: String,
    ) -> Self {
        ExecutionResult {
            exit_code,
            signal,
            stdout,
            stderr,
            ..self
        }
    }

    pub fn is_complete(&self) -> bool {
        self.exit_code != EXIT_CODE_PENDING
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(Username::new("ubuntu").is_ok());
        assert!(Username::new("build-bot_2").is_ok());
        assert!(Username::new("").is_err());
        assert!(Username::new("a".repeat(300)).is_err());
        assert!(Username::new("user@host").is_err());
        assert!(Username::new("two words").is_err());
    }

    #[test]
    fn test_username_try_from_trims() {
        let user = Username::try_from("  pi ").unwrap();
        assert_eq!(user.as_str(), "pi");
    }

    #[test]
    fn test_device_type() {
        let host = HostDescriptor {
            device_id: "jetson".to_string(),
            architecture: "aarch64".to_string(),
            os: "GNU/Linux".to_string(),
            device_id_command: String::new(),
            interfaces: vec![],
            credentials: vec![],
        };
        assert_eq!(host.device_type(), "jetson+aarch64");
    }

    #[test]
    fn test_host_deserializes_catalog_keys() {
        let raw = r#"{
            "Device ID": "rpi3",
            "Architecture": "armv7l",
            "OS": "GNU/Linux",
            "Device ID Command": "cat /proc/device-tree/model",
            "Interface_list": [{"IP": "10.0.0.2"}, {"IP": "192.168.1.2"}],
            "Users": [{"name": "pi", "Key": "/home/me/.ssh/id_rsa"}]
        }"#;

        let host: HostDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(host.device_id, "rpi3");
        assert_eq!(host.interfaces.len(), 2);
        assert_eq!(host.interfaces[1].address, "192.168.1.2");
        assert_eq!(host.credentials[0].username().as_str(), "pi");
        assert_eq!(
            host.credentials[0].key_path(),
            Path::new("/home/me/.ssh/id_rsa")
        );
    }

    #[test]
    fn test_host_rejects_invalid_username() {
        let raw = r#"{
            "Device ID": "rpi3",
            "Architecture": "armv7l",
            "OS": "GNU/Linux",
            "Users": [{"name": "", "Key": "/k"}]
        }"#;
        assert!(serde_json::from_str::<HostDescriptor>(raw).is_err());
    }

    #[test]
    fn test_execution_result_completes_once() {
        let cred = Credential::new(Username::new("pi").unwrap(), "/k");
        let pending = ExecutionResult::pending(cred, "10.0.0.2");
        assert!(!pending.is_complete());
        assert_eq!(pending.exit_code, -1);

        let done = pending.complete(0, None, "hi".to_string(), String::new());
        assert!(done.is_complete());
        assert!(done.success());
        assert_eq!(done.stdout, "hi");
    }
}
