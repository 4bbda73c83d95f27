//! Scripted transport for testing without real hosts
//!
//! Reachability, accepted logins and command replies are configured up
//! front with builder methods. Every batch and copy is recorded so tests can
//! assert on what would have been sent.

use super::session::{PtyOptions, SessionEvent, SessionStream, Transport};
use crate::models::{Credential, Interface};
use crate::utils::{FleetError, Result, TransferDirection};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// One exec or shell request seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedBatch {
    pub address: String,
    pub username: String,
    pub batch: String,
    pub pty: bool,
    pub shell: bool,
}

/// One file copy seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    pub address: String,
    pub direction: TransferDirection,
    pub local: PathBuf,
    pub remote: String,
}

#[derive(Debug, Clone)]
struct Reply {
    address: Option<String>,
    matcher: String,
    text: String,
}

impl Reply {
    fn applies(&self, address: &str, line: &str) -> bool {
        self.address.as_deref().map_or(true, |a| a == address) && line.contains(&self.matcher)
    }
}

/// Mock transport for testing
#[derive(Debug, Default)]
pub struct MockTransport {
    reachable: HashSet<String>,
    accepted: HashSet<(String, String)>,
    exec_failures: HashSet<String>,
    stdout_replies: Vec<Reply>,
    stderr_replies: Vec<Reply>,
    delays: HashMap<String, Duration>,
    echo_input: bool,
    exit_code: i32,
    exit_signal: Option<String>,
    executed: Mutex<Vec<ExecutedBatch>>,
    copies: Mutex<Vec<CopyRecord>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer pings from `address`
    pub fn reachable(mut self, address: &str) -> Self {
        self.reachable.insert(address.to_string());
        self
    }

    /// Let `username` log into `address`
    pub fn accept(mut self, address: &str, username: &str) -> Self {
        self.accepted
            .insert((address.to_string(), username.to_string()));
        self
    }

    /// Log in fine but fail to open the exec channel on `address`
    pub fn fail_exec_setup(mut self, address: &str) -> Self {
        self.exec_failures.insert(address.to_string());
        self
    }

    /// Emit `text` on stdout for every submitted line containing `matcher`
    pub fn reply(mut self, matcher: &str, text: &str) -> Self {
        self.stdout_replies.push(Reply {
            address: None,
            matcher: matcher.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Like [`MockTransport::reply`], limited to one address
    pub fn reply_for(mut self, address: &str, matcher: &str, text: &str) -> Self {
        self.stdout_replies.push(Reply {
            address: Some(address.to_string()),
            matcher: matcher.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Emit `text` on stderr for every submitted line containing `matcher`
    pub fn stderr_reply(mut self, matcher: &str, text: &str) -> Self {
        self.stderr_replies.push(Reply {
            address: None,
            matcher: matcher.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Echo each submitted line behind a `user@mock:~$ ` prompt, like a pty
    pub fn echo_input(mut self, echo: bool) -> Self {
        self.echo_input = echo;
        self
    }

    /// Hold every session opened by `username` for `delay` before answering
    pub fn delay_for(mut self, username: &str, delay: Duration) -> Self {
        self.delays.insert(username.to_string(), delay);
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn exit_signal(mut self, signal: &str) -> Self {
        self.exit_signal = Some(signal.to_string());
        self
    }

    pub fn executed(&self) -> Vec<ExecutedBatch> {
        self.executed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn copies(&self) -> Vec<CopyRecord> {
        self.copies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    async fn open(
        &self,
        interface: &Interface,
        credential: &Credential,
        batch: &str,
        pty: bool,
        shell: bool,
    ) -> Result<SessionStream> {
        let username = credential.username().as_str();
        self.executed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(ExecutedBatch {
                address: interface.address.clone(),
                username: username.to_string(),
                batch: batch.to_string(),
                pty,
                shell,
            });

        if let Some(delay) = self.delays.get(username) {
            tokio::time::sleep(*delay).await;
        }

        self.authenticate(interface, credential)?;

        if self.exec_failures.contains(&interface.address) {
            return Err(FleetError::ExecSetup {
                address: interface.address.clone(),
                reason: "channel open refused".to_string(),
            });
        }

        Ok(self.replay(&interface.address, username, batch))
    }

    fn authenticate(&self, interface: &Interface, credential: &Credential) -> Result<()> {
        let key = (
            interface.address.clone(),
            credential.username().as_str().to_string(),
        );
        if self.accepted.contains(&key) {
            Ok(())
        } else {
            Err(FleetError::Connection {
                address: interface.address.clone(),
                username: credential.username().to_string(),
                reason: "authentication failed".to_string(),
            })
        }
    }

    fn replay(&self, address: &str, username: &str, batch: &str) -> SessionStream {
        let mut events = Vec::new();
        for line in batch.lines() {
            if self.echo_input {
                events.push(SessionEvent::Stdout(format!("{username}@mock:~$ {line}\r\n")));
            }
            for reply in self.stdout_replies.iter().filter(|r| r.applies(address, line)) {
                events.push(SessionEvent::Stdout(reply.text.clone()));
            }
            for reply in self.stderr_replies.iter().filter(|r| r.applies(address, line)) {
                events.push(SessionEvent::Stderr(reply.text.clone()));
            }
        }
        events.push(SessionEvent::Closed {
            exit_code: self.exit_code,
            signal: self.exit_signal.clone(),
        });

        let (tx, stream) = SessionStream::channel(events.len());
        for event in events {
            let _ = tx.try_send(event);
        }
        stream
    }

    fn record_copy(
        &self,
        interface: &Interface,
        credential: &Credential,
        direction: TransferDirection,
        local: &Path,
        remote: &str,
    ) -> Result<()> {
        self.authenticate(interface, credential)
            .map_err(|e| FleetError::Transfer {
                address: interface.address.clone(),
                direction,
                reason: e.to_string(),
            })?;
        self.copies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(CopyRecord {
                address: interface.address.clone(),
                direction,
                local: local.to_path_buf(),
                remote: remote.to_string(),
            });
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn ping(&self, address: &str) -> Result<bool> {
        Ok(self.reachable.contains(address))
    }

    async fn exec(
        &self,
        interface: &Interface,
        credential: &Credential,
        batch: &str,
        pty: Option<PtyOptions>,
    ) -> Result<SessionStream> {
        self.open(interface, credential, batch, pty.is_some(), false)
            .await
    }

    async fn shell(
        &self,
        interface: &Interface,
        credential: &Credential,
        input: &str,
    ) -> Result<SessionStream> {
        self.open(interface, credential, input, true, true).await
    }

    async fn copy_to_host(
        &self,
        local: &Path,
        remote: &str,
        interface: &Interface,
        credential: &Credential,
    ) -> Result<()> {
        self.record_copy(interface, credential, TransferDirection::ToHost, local, remote)
    }

    async fn copy_from_host(
        &self,
        remote: &str,
        local: &Path,
        interface: &Interface,
        credential: &Credential,
    ) -> Result<()> {
        self.record_copy(interface, credential, TransferDirection::FromHost, local, remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Username;

    fn cred(name: &str) -> Credential {
        Credential::new(Username::new(name).unwrap(), "/keys/id")
    }

    #[tokio::test]
    async fn test_mock_ping() {
        let transport = MockTransport::new().reachable("10.0.0.2");
        assert!(transport.ping("10.0.0.2").await.unwrap());
        assert!(!transport.ping("10.0.0.3").await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_rejects_unknown_login() {
        let transport = MockTransport::new().accept("10.0.0.2", "pi");
        let result = transport
            .exec(&Interface::new("10.0.0.2"), &cred("root"), "ls\n", None)
            .await;
        assert!(matches!(result, Err(FleetError::Connection { .. })));
        assert_eq!(transport.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_replays_replies_then_close() {
        let transport = MockTransport::new()
            .accept("10.0.0.2", "pi")
            .reply_for("10.0.0.2", "uname", "aarch64 GNU/Linux\n")
            .reply_for("10.0.0.9", "uname", "x86_64 GNU/Linux\n");

        let mut stream = transport
            .exec(&Interface::new("10.0.0.2"), &cred("pi"), "uname -om\nexit\n", None)
            .await
            .unwrap();

        assert_eq!(
            stream.next_event().await,
            Some(SessionEvent::Stdout("aarch64 GNU/Linux\n".to_string()))
        );
        assert!(matches!(
            stream.next_event().await,
            Some(SessionEvent::Closed { exit_code: 0, .. })
        ));
    }
}
