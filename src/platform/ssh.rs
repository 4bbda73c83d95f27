//! SSH transport over `ssh2`
//!
//! Every call opens its own TCP connection and SSH session on a blocking
//! worker thread. Setup errors (connect, handshake, auth, channel/exec) are
//! reported back before a stream is handed out; afterwards the worker pumps
//! stdout/stderr chunks into the stream until the channel closes or the
//! receiver goes away.

use crate::constants::{
    DEFAULT_SSH_PORT, PING_TIMEOUT_SECS, SESSION_EVENT_BUFFER, SESSION_POLL_INTERVAL_MS,
    SSH_CONNECT_TIMEOUT_SECS,
};
use crate::core::session::{PtyOptions, SessionEvent, SessionStream, Transport};
use crate::models::{Credential, Interface};
use crate::utils::{FleetError, Result, TransferDirection};
use ssh2::{Channel, Session};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Connection settings shared by every session the transport opens
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Port used when an address carries none
    pub port: u16,
    /// Bound on TCP connect, handshake and authentication
    pub connect_timeout: Duration,
    /// Terminal requested for interactive shells
    pub pty: PtyOptions,
    /// Passed to the system `scp` as `StrictHostKeyChecking`
    pub strict_host_key_checking: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            connect_timeout: Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS),
            pty: PtyOptions::default(),
            strict_host_key_checking: false,
        }
    }
}

/// What to run once the session is authenticated
enum ChannelRequest {
    Exec {
        batch: String,
        pty: Option<PtyOptions>,
    },
    Shell {
        input: String,
        pty: PtyOptions,
    },
}

/// Real transport: `ssh2` sessions, the system `ping` and the system `scp`
#[derive(Debug, Clone, Default)]
pub struct SshTransport {
    config: SshConfig,
}

impl SshTransport {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    async fn open_stream(
        &self,
        interface: &Interface,
        credential: &Credential,
        request: ChannelRequest,
    ) -> Result<SessionStream> {
        let address = interface.address.clone();
        let username = credential.username().to_string();
        let credential = credential.clone();
        let config = self.config.clone();

        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (tx, stream) = SessionStream::channel(SESSION_EVENT_BUFFER);

        tokio::task::spawn_blocking(move || {
            let setup = connect(&address, &credential, &config).and_then(|session| {
                open_channel(&session, &address, &request).map(|channel| (session, channel))
            });

            match setup {
                Ok((session, channel)) => {
                    if ready_tx.send(Ok(())).is_err() {
                        return;
                    }
                    pump(&address, session, channel, tx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(stream),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FleetError::Connection {
                address: interface.address.clone(),
                username,
                reason: "session worker exited during setup".to_string(),
            }),
        }
    }
}

/// Split `host:port`, `[v6]:port` or a bare host
fn split_address(address: &str, default_port: u16) -> (String, u16) {
    let address = address.trim();

    if let Some(rest) = address.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(default_port);
            return (host.to_string(), port);
        }
    }

    if let Some((host, port)) = address.rsplit_once(':') {
        if !host.contains(':') {
            if let Ok(port_num) = port.parse::<u16>() {
                return (host.to_string(), port_num);
            }
        }
    }

    (address.to_string(), default_port)
}

fn connection_error(address: &str, credential: &Credential, reason: impl ToString) -> FleetError {
    FleetError::Connection {
        address: address.to_string(),
        username: credential.username().to_string(),
        reason: reason.to_string(),
    }
}

fn exec_setup_error(address: &str, reason: impl ToString) -> FleetError {
    FleetError::ExecSetup {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

/// Connect, handshake and authenticate with the credential's private key
fn connect(address: &str, credential: &Credential, config: &SshConfig) -> Result<Session> {
    let (host, port) = split_address(address, config.port);

    let socket_addr = (host.as_str(), port)
        .to_socket_addrs()
        .map_err(|e| connection_error(address, credential, format!("resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| connection_error(address, credential, format!("no address for {host}")))?;

    let tcp = TcpStream::connect_timeout(&socket_addr, config.connect_timeout).map_err(|e| {
        connection_error(address, credential, format!("connect to {host}:{port}: {e}"))
    })?;

    let mut session = Session::new()
        .map_err(|e| connection_error(address, credential, format!("session init: {e}")))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(config.connect_timeout.as_millis().min(u32::MAX as u128) as u32);
    session
        .handshake()
        .map_err(|e| connection_error(address, credential, format!("handshake: {e}")))?;

    session
        .userauth_pubkey_file(
            credential.username().as_str(),
            None,
            credential.key_path(),
            None,
        )
        .map_err(|e| connection_error(address, credential, format!("authentication: {e}")))?;
    if !session.authenticated() {
        return Err(connection_error(address, credential, "authentication failed"));
    }

    // setup is bounded, the session itself is not
    session.set_timeout(0);

    tracing::debug!("ssh session open: {}@{}", credential.username(), address);
    Ok(session)
}

fn request_pty(channel: &mut Channel, address: &str, pty: &PtyOptions) -> Result<()> {
    channel
        .request_pty(&pty.term, None, Some((pty.cols, pty.rows, 0, 0)))
        .map_err(|e| exec_setup_error(address, format!("pty request: {e}")))
}

fn open_channel(session: &Session, address: &str, request: &ChannelRequest) -> Result<Channel> {
    let mut channel = session
        .channel_session()
        .map_err(|e| exec_setup_error(address, format!("channel open: {e}")))?;

    match request {
        ChannelRequest::Exec { batch, pty } => {
            if let Some(pty) = pty {
                request_pty(&mut channel, address, pty)?;
            }
            channel
                .exec(batch)
                .map_err(|e| exec_setup_error(address, format!("exec: {e}")))?;
        }
        ChannelRequest::Shell { input, pty } => {
            request_pty(&mut channel, address, pty)?;
            channel
                .shell()
                .map_err(|e| exec_setup_error(address, format!("shell: {e}")))?;
            channel
                .write_all(input.as_bytes())
                .and_then(|_| channel.flush())
                .map_err(|e| exec_setup_error(address, format!("shell input: {e}")))?;
            channel
                .send_eof()
                .map_err(|e| exec_setup_error(address, format!("shell eof: {e}")))?;
        }
    }

    Ok(channel)
}

/// Decode as much of `pending` + `bytes` as forms complete UTF-8, keeping a
/// trailing partial sequence for the next read.
fn decode_chunk(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);

    let valid_up_to = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };

    let rest = pending.split_off(valid_up_to);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

enum ReadOutcome {
    Data(String),
    Idle,
    Failed(io::Error),
}

fn read_some(reader: &mut impl Read, buf: &mut [u8], pending: &mut Vec<u8>) -> ReadOutcome {
    match reader.read(buf) {
        Ok(0) => ReadOutcome::Idle,
        Ok(n) => {
            let text = decode_chunk(pending, &buf[..n]);
            if text.is_empty() {
                ReadOutcome::Idle
            } else {
                ReadOutcome::Data(text)
            }
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => ReadOutcome::Idle,
        Err(e) => ReadOutcome::Failed(e),
    }
}

/// Forward channel output into `tx` until EOF, then send the close event.
///
/// Returns early (dropping the connection) once the receiving stream is gone.
fn pump(address: &str, session: Session, mut channel: Channel, tx: mpsc::Sender<SessionEvent>) {
    session.set_blocking(false);

    let mut buf = [0u8; 8192];
    let mut out_pending = Vec::new();
    let mut err_pending = Vec::new();

    loop {
        if tx.is_closed() {
            tracing::debug!("session on {} terminated by receiver", address);
            let _ = session.disconnect(None, "terminated", None);
            return;
        }

        let mut progressed = false;

        match read_some(&mut channel, &mut buf, &mut out_pending) {
            ReadOutcome::Data(text) => {
                progressed = true;
                if tx.blocking_send(SessionEvent::Stdout(text)).is_err() {
                    continue;
                }
            }
            ReadOutcome::Idle => {}
            ReadOutcome::Failed(e) => {
                tracing::debug!("stdout read on {} failed: {}", address, e);
                break;
            }
        }

        match read_some(&mut channel.stderr(), &mut buf, &mut err_pending) {
            ReadOutcome::Data(text) => {
                progressed = true;
                if tx.blocking_send(SessionEvent::Stderr(text)).is_err() {
                    continue;
                }
            }
            ReadOutcome::Idle => {}
            ReadOutcome::Failed(e) => {
                tracing::debug!("stderr read on {} failed: {}", address, e);
                break;
            }
        }

        if !progressed {
            if channel.eof() {
                break;
            }
            std::thread::sleep(Duration::from_millis(SESSION_POLL_INTERVAL_MS));
        }
    }

    session.set_blocking(true);
    for (pending, is_stderr) in [(out_pending, false), (err_pending, true)] {
        if !pending.is_empty() {
            let text = String::from_utf8_lossy(&pending).into_owned();
            let event = if is_stderr {
                SessionEvent::Stderr(text)
            } else {
                SessionEvent::Stdout(text)
            };
            let _ = tx.blocking_send(event);
        }
    }

    let _ = channel.wait_close();
    let exit_code = channel.exit_status().unwrap_or(0);
    let signal = channel.exit_signal().ok().and_then(|s| s.exit_signal);
    tracing::debug!("session on {} closed with {}", address, exit_code);

    let _ = tx.blocking_send(SessionEvent::Closed { exit_code, signal });
}

fn ping_command(address: &str) -> Command {
    let mut cmd = Command::new("ping");

    #[cfg(windows)]
    {
        cmd.arg("-n")
            .arg("1")
            .arg("-w")
            .arg((PING_TIMEOUT_SECS * 1000).to_string())
            .arg(address);
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    #[cfg(not(windows))]
    {
        cmd.arg("-c")
            .arg("1")
            .arg("-W")
            .arg(PING_TIMEOUT_SECS.to_string())
            .arg(address);
    }

    cmd
}

/// Arguments for the system `scp`, remote side quoted for the remote shell
fn scp_args(
    config: &SshConfig,
    address: &str,
    credential: &Credential,
    source: ScpEndpoint<'_>,
    dest: ScpEndpoint<'_>,
) -> Vec<String> {
    let (host, port) = split_address(address, config.port);
    let host = if host.contains(':') {
        format!("[{host}]")
    } else {
        host
    };

    let render = |endpoint: ScpEndpoint<'_>| match endpoint {
        ScpEndpoint::Local(path) => path.to_string_lossy().into_owned(),
        ScpEndpoint::Remote(path) => format!(
            "{}@{}:{}",
            credential.username(),
            host,
            shell_escape::escape(path.into())
        ),
    };

    let strict = if config.strict_host_key_checking {
        "yes"
    } else {
        "no"
    };

    vec![
        "-o".to_string(),
        format!("StrictHostKeyChecking={strict}"),
        "-i".to_string(),
        credential.key_path().to_string_lossy().into_owned(),
        "-P".to_string(),
        port.to_string(),
        "-r".to_string(),
        render(source),
        render(dest),
    ]
}

#[derive(Debug, Clone, Copy)]
enum ScpEndpoint<'a> {
    Local(&'a Path),
    Remote(&'a str),
}

fn transfer_error(address: &str, direction: TransferDirection, reason: impl ToString) -> FleetError {
    FleetError::Transfer {
        address: address.to_string(),
        direction,
        reason: reason.to_string(),
    }
}

async fn run_scp(address: &str, direction: TransferDirection, args: Vec<String>) -> Result<()> {
    tracing::debug!("scp {}", args.join(" "));

    let output = tokio::task::spawn_blocking(move || {
        let mut cmd = Command::new("scp");
        cmd.args(&args);

        #[cfg(windows)]
        {
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.output()
    })
    .await
    .map_err(|e| transfer_error(address, direction, format!("scp task failed: {e}")))?
    .map_err(|e| transfer_error(address, direction, format!("couldn't run scp: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(transfer_error(
            address,
            direction,
            format!("scp exited with {}: {}", output.status, stderr.trim()),
        ))
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> i32 {
    use std::os::unix::fs::PermissionsExt;
    (metadata.permissions().mode() & 0o777) as i32
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> i32 {
    0o644
}

/// Send one regular file over the session's SCP channel
fn scp_send_file(
    address: &str,
    credential: &Credential,
    config: &SshConfig,
    local: &Path,
    remote: &str,
) -> Result<()> {
    let to_host = |reason: String| transfer_error(address, TransferDirection::ToHost, reason);

    let mut file = std::fs::File::open(local)
        .map_err(|e| to_host(format!("open {}: {e}", local.display())))?;
    let metadata = file
        .metadata()
        .map_err(|e| to_host(format!("stat {}: {e}", local.display())))?;

    let session = connect(address, credential, config).map_err(|e| to_host(e.to_string()))?;
    let mut channel = session
        .scp_send(Path::new(remote), file_mode(&metadata), metadata.len(), None)
        .map_err(|e| to_host(format!("scp channel: {e}")))?;

    io::copy(&mut file, &mut channel).map_err(|e| to_host(format!("write: {e}")))?;

    channel
        .send_eof()
        .and_then(|_| channel.wait_eof())
        .and_then(|_| channel.close())
        .and_then(|_| channel.wait_close())
        .map_err(|e| to_host(format!("finish: {e}")))?;

    tracing::debug!("sent {} to {}:{}", local.display(), address, remote);
    Ok(())
}

#[async_trait::async_trait]
impl Transport for SshTransport {
    async fn ping(&self, address: &str) -> Result<bool> {
        let (host, _) = split_address(address, self.config.port);
        let output = tokio::task::spawn_blocking(move || ping_command(&host).output())
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("ping task failed: {e}")))??;

        Ok(output.status.success())
    }

    async fn exec(
        &self,
        interface: &Interface,
        credential: &Credential,
        batch: &str,
        pty: Option<PtyOptions>,
    ) -> Result<SessionStream> {
        let request = ChannelRequest::Exec {
            batch: batch.to_string(),
            pty,
        };
        self.open_stream(interface, credential, request).await
    }

    async fn shell(
        &self,
        interface: &Interface,
        credential: &Credential,
        input: &str,
    ) -> Result<SessionStream> {
        let request = ChannelRequest::Shell {
            input: input.to_string(),
            pty: self.config.pty.clone(),
        };
        self.open_stream(interface, credential, request).await
    }

    async fn copy_to_host(
        &self,
        local: &Path,
        remote: &str,
        interface: &Interface,
        credential: &Credential,
    ) -> Result<()> {
        let address = interface.address.as_str();

        if local.is_dir() {
            let args = scp_args(
                &self.config,
                address,
                credential,
                ScpEndpoint::Local(local),
                ScpEndpoint::Remote(remote),
            );
            return run_scp(address, TransferDirection::ToHost, args).await;
        }

        let owned_address = address.to_string();
        let credential = credential.clone();
        let config = self.config.clone();
        let local: PathBuf = local.to_path_buf();
        let remote = remote.to_string();

        tokio::task::spawn_blocking(move || {
            scp_send_file(&owned_address, &credential, &config, &local, &remote)
        })
        .await
        .map_err(|e| {
            transfer_error(address, TransferDirection::ToHost, format!("copy task failed: {e}"))
        })?
    }

    async fn copy_from_host(
        &self,
        remote: &str,
        local: &Path,
        interface: &Interface,
        credential: &Credential,
    ) -> Result<()> {
        let address = interface.address.as_str();
        let args = scp_args(
            &self.config,
            address,
            credential,
            ScpEndpoint::Remote(remote),
            ScpEndpoint::Local(local),
        );
        run_scp(address, TransferDirection::FromHost, args).await
    }
}
