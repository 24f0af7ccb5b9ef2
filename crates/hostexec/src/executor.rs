//! Command executor capability and its tokio-backed implementation.

use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Capability for running external tools.
///
/// Both methods fail with [`Error::Failed`] when the child exits non-zero.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion and return its stdout.
    async fn exec(&self, name: &str, args: &[&str]) -> Result<Vec<u8>>;

    /// Run a command under `ctx` and return stdout followed by stderr.
    ///
    /// When `ctx` finishes first, the child's whole process group is killed.
    async fn exec_ctx(&self, ctx: &Context, name: &str, args: &[&str]) -> Result<Vec<u8>>;
}

/// Executor that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor;

/// Render a command line for logs and error messages.
pub fn command_line(name: &str, args: &[&str]) -> String {
    if args.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, args.join(" "))
    }
}

fn describe_status(output: &Output) -> (Option<i32>, String) {
    match output.status.code() {
        Some(code) => (Some(code), format!("exit status {code}")),
        None => (None, "terminated by signal".to_string()),
    }
}

#[async_trait]
impl CommandExecutor for Executor {
    async fn exec(&self, name: &str, args: &[&str]) -> Result<Vec<u8>> {
        let command = command_line(name, args);
        log::debug!("Running {command}");

        let output = Command::new(name)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let (code, status) = describe_status(&output);
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(Error::Failed {
            command,
            code,
            status,
            output: text,
        })
    }

    async fn exec_ctx(&self, ctx: &Context, name: &str, args: &[&str]) -> Result<Vec<u8>> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let command = command_line(name, args);
        log::debug!("Running {command}");

        let child = Command::new(name)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;
        let pid = child.id();

        tokio::select! {
            output = child.wait_with_output() => {
                let output = output.map_err(|source| Error::Spawn {
                    command: command.clone(),
                    source,
                })?;
                let mut combined = output.stdout.clone();
                combined.extend_from_slice(&output.stderr);
                if output.status.success() {
                    return Ok(combined);
                }
                let (code, status) = describe_status(&output);
                Err(Error::Failed {
                    command,
                    code,
                    status,
                    output: String::from_utf8_lossy(&combined).into_owned(),
                })
            }
            () = ctx.done() => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                log::debug!("Cancelled {command}");
                Err(ctx.err().unwrap_or(Error::Cancelled))
            }
        }
    }
}

/// Kill every process in the group led by `pid`.
#[allow(unsafe_code)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only signals processes; an already-reaped group yields ESRCH.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        log::debug!(
            "killpg({pgid}) failed: {}",
            std::io::Error::last_os_error()
        );
    }
}
