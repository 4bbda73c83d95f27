//! Remote command execution over a pty-backed exec session
//!
//! A command list is sent as one batch (with a trailing `exit`), output is
//! streamed to optional callbacks while it accumulates, and the captured
//! stdout is cleaned of prompts and command echoes once the session closes.
//!
//! # Example
//!
//! ```ignore
//! let result = execute(&transport, &["make -j4"], &intf, &cred, None, None).await?;
//! println!("exit {}: {}", result.exit_code, result.stdout);
//! ```

use super::session::{PtyOptions, SessionEvent, Transport};
use crate::constants::SESSION_EXIT_COMMAND;
use crate::models::{Credential, ExecutionResult, Interface};
use crate::utils::{FleetError, Result, StreamKind};
use regex::Regex;

/// Chunk callback. Returning `true` aborts the session.
pub type ChunkCallback<'a> = &'a mut (dyn FnMut(&str) -> bool + Send);

/// Post-processing applied to captured stdout when a session closes
pub trait OutputFilter: Send + Sync {
    fn clean(&self, stdout: &str, username: &str, commands: &[String]) -> String;
}

/// Best-effort removal of shell prompts (`user@host:dir$`) and echoed
/// command lines, case-insensitive.
///
/// A prompt is only the `user@...$` token itself, with no whitespace before
/// the `$`. A command echo is only removed when it fills a whole line once the
/// prompt is gone, so output that merely mentions a command (or `exit`) is
/// kept. Multi-line commands are only stripped where the echo reproduces each
/// line verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoStripper;

impl EchoStripper {
    fn prompt_pattern(username: &str) -> String {
        let starts_with_word = username
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        let boundary = if starts_with_word { r"\b" } else { "" };
        format!(r"(?i){}{}@[^\s$]*\$", boundary, regex::escape(username))
    }

    fn echo_line_pattern(command: &str) -> String {
        format!(r"(?im)^[ \t]*{}[ \t]*\r?(?:\n|$)", regex::escape(command))
    }
}

impl OutputFilter for EchoStripper {
    fn clean(&self, stdout: &str, username: &str, commands: &[String]) -> String {
        let mut cleaned = stdout.to_string();

        if let Ok(re) = Regex::new(&Self::prompt_pattern(username)) {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }

        for command in commands {
            let command = command.trim();
            if command.is_empty() {
                continue;
            }
            if let Ok(re) = Regex::new(&Self::echo_line_pattern(command)) {
                cleaned = re.replace_all(&cleaned, "").into_owned();
            }
        }

        cleaned
    }
}

/// Leaves stdout untouched, for sessions that do not echo input
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl OutputFilter for PassThrough {
    fn clean(&self, stdout: &str, _username: &str, _commands: &[String]) -> String {
        stdout.to_string()
    }
}

/// Commands as submitted, including the trailing exit
pub fn submitted_commands<S: AsRef<str>>(commands: &[S]) -> Vec<String> {
    commands
        .iter()
        .map(|c| c.as_ref().to_string())
        .chain(std::iter::once(SESSION_EXIT_COMMAND.to_string()))
        .collect()
}

/// Newline-joined batch with the trailing exit
pub fn command_batch<S: AsRef<str>>(commands: &[S]) -> String {
    let mut batch = submitted_commands(commands).join("\n");
    batch.push('\n');
    batch
}

/// Knobs for [`execute_with`]
pub struct ExecOptions<'a> {
    pub on_stdout: Option<ChunkCallback<'a>>,
    pub on_stderr: Option<ChunkCallback<'a>>,
    pub filter: &'a dyn OutputFilter,
    pub pty: Option<PtyOptions>,
}

impl Default for ExecOptions<'_> {
    fn default() -> Self {
        Self {
            on_stdout: None,
            on_stderr: None,
            filter: &EchoStripper,
            pty: Some(PtyOptions::default()),
        }
    }
}

/// Run `commands` on the host and collect a structured result.
///
/// `on_stderr`/`on_stdout` see every chunk as it arrives; a callback
/// returning `true` terminates the session and fails the call with
/// `FleetError::AbortedByCallback`.
pub async fn execute<'a, S: AsRef<str>>(
    transport: &dyn Transport,
    commands: &[S],
    interface: &Interface,
    credential: &Credential,
    on_stderr: Option<ChunkCallback<'a>>,
    on_stdout: Option<ChunkCallback<'a>>,
) -> Result<ExecutionResult> {
    let options = ExecOptions {
        on_stdout,
        on_stderr,
        ..ExecOptions::default()
    };
    execute_with(transport, commands, interface, credential, options).await
}

/// [`execute`] with an explicit output filter and pty request
pub async fn execute_with<S: AsRef<str>>(
    transport: &dyn Transport,
    commands: &[S],
    interface: &Interface,
    credential: &Credential,
    mut options: ExecOptions<'_>,
) -> Result<ExecutionResult> {
    let submitted = submitted_commands(commands);
    let batch = command_batch(commands);

    tracing::debug!(
        "exec on {}@{}: {} command(s)",
        credential.username(),
        interface.address,
        submitted.len()
    );

    let mut stream = transport
        .exec(interface, credential, &batch, options.pty.take())
        .await?;

    let pending = ExecutionResult::pending(credential.clone(), interface.address.clone());
    let mut stdout = String::new();
    let mut stderr = String::new();

    while let Some(event) = stream.next_event().await {
        match event {
            SessionEvent::Stdout(chunk) => {
                stdout.push_str(&chunk);
                if let Some(cb) = options.on_stdout.as_deref_mut() {
                    if cb(&chunk) {
                        stream.terminate();
                        return Err(FleetError::AbortedByCallback {
                            address: interface.address.clone(),
                            stream: StreamKind::Stdout,
                            chunk,
                        });
                    }
                }
            }
            SessionEvent::Stderr(chunk) => {
                stderr.push_str(&chunk);
                if let Some(cb) = options.on_stderr.as_deref_mut() {
                    if cb(&chunk) {
                        stream.terminate();
                        return Err(FleetError::AbortedByCallback {
                            address: interface.address.clone(),
                            stream: StreamKind::Stderr,
                            chunk,
                        });
                    }
                }
            }
            SessionEvent::Closed { exit_code, signal } => {
                let cleaned =
                    options
                        .filter
                        .clean(&stdout, credential.username().as_str(), &submitted);
                return Ok(pending.complete(exit_code, signal, cleaned, stderr));
            }
        }
    }

    Err(FleetError::Connection {
        address: interface.address.clone(),
        username: credential.username().to_string(),
        reason: "session ended without an exit status".to_string(),
    })
}
