use super::{io_error, Environment, SourceError};
use crate::parameter::{RemoteTarget, SshCredential};
use crate::shared::{is_blank, join_lines};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// How long to wait for the remote side to report an exit status.
pub const REMOTE_WAIT_CEILING: Duration = Duration::from_secs(60);

/// OpenSSH exits with 255 when it could not connect or authenticate.
pub const SSH_TRANSPORT_FAILURE_EXIT: i32 = 255;

const PASSWORD_ENV: &str = "CHOICEPARAM_SSH_PASSWORD";
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READER_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub binary: String,
    pub wait_ceiling: Duration,
    pub extra_args: Vec<String>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            wait_ceiling: REMOTE_WAIT_CEILING,
            extra_args: vec![
                "-o".to_string(),
                "StrictHostKeyChecking=accept-new".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOutcome {
    /// Standard output lines joined with `,`.
    pub output: Option<String>,
    /// `None` when the wait ceiling was reached first.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl RemoteOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn timeout_error(&self, command: &str, options: &SshOptions) -> Option<SourceError> {
        self.timed_out.then(|| SourceError::Timeout {
            command: command.to_string(),
            waited_ms: u64::try_from(options.wait_ceiling.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

/// A spawned ssh process that is killed and reaped when dropped, so the
/// connection is released on every exit path.
struct Session {
    child: Child,
    reaped: bool,
}

impl Session {
    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    fn close(&mut self) {
        if !self.reaped {
            kill_process_group(&self.child);
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
    }
}

/// The ssh child leads its own process group, so anything it forked (a
/// wrapper's children, a connection master) goes down with it. Must run
/// before the leader is reaped.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: signalling a process group we created; no memory is shared.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "failed to signal ssh process group"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Scratch files that carry the credential to the ssh process. Removed when
/// dropped.
struct CredentialFiles {
    _dir: TempDir,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

fn prepare_credentials(
    command: &str,
    credential: &SshCredential,
) -> Result<CredentialFiles, SourceError> {
    let dir = tempfile::Builder::new()
        .prefix("choiceparam-ssh")
        .tempdir()
        .map_err(|e| io_error(command, e))?;

    match credential {
        SshCredential::PrivateKey(material) => {
            let key_path = dir.path().join("identity");
            let mut material = material.clone();
            if !material.ends_with('\n') {
                material.push('\n');
            }
            write_private_file(&key_path, &material, 0o600).map_err(|e| io_error(command, e))?;
            Ok(CredentialFiles {
                args: vec![
                    "-i".to_string(),
                    key_path.display().to_string(),
                    "-o".to_string(),
                    "IdentitiesOnly=yes".to_string(),
                    "-o".to_string(),
                    "BatchMode=yes".to_string(),
                ],
                env: Vec::new(),
                _dir: dir,
            })
        }
        SshCredential::Password(password) => {
            let askpass = dir.path().join("askpass.sh");
            let script = format!("#!/bin/sh\nprintf '%s\\n' \"${PASSWORD_ENV}\"\n");
            write_private_file(&askpass, &script, 0o700).map_err(|e| io_error(command, e))?;
            Ok(CredentialFiles {
                args: vec![
                    "-o".to_string(),
                    "PreferredAuthentications=password,keyboard-interactive".to_string(),
                    "-o".to_string(),
                    "NumberOfPasswordPrompts=1".to_string(),
                ],
                env: vec![
                    ("SSH_ASKPASS".to_string(), askpass.display().to_string()),
                    ("SSH_ASKPASS_REQUIRE".to_string(), "force".to_string()),
                    (PASSWORD_ENV.to_string(), password.clone()),
                ],
                _dir: dir,
            })
        }
    }
}

fn write_private_file(path: &Path, body: &str, mode: u32) -> std::io::Result<()> {
    fs::write(path, body)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

/// Runs `command` on `target` through the ssh client and collects its
/// standard output.
///
/// Waits at most `options.wait_ceiling` for an exit status. Reaching the
/// ceiling is not an error: the session is closed and whatever output was
/// captured so far is returned with `timed_out` set. A transport or
/// authentication failure is [`SourceError::AuthenticationFailed`]; any other
/// non-zero exit is reported through `exit_code` for the caller to judge.
pub fn run_remote_command(
    command: &str,
    target: &RemoteTarget,
    env: &Environment,
    options: &SshOptions,
) -> Result<RemoteOutcome, SourceError> {
    let credentials = prepare_credentials(command, &target.credential)?;

    let mut process = Command::new(&options.binary);
    process.args(&options.extra_args).args(&credentials.args);
    if !is_blank(&target.user) {
        process.arg("-l").arg(&target.user);
    }
    process.arg(&target.host).arg(command);

    process.env_clear();
    for (key, value) in env.iter() {
        process.env(key, value);
    }
    for (key, value) in &credentials.env {
        process.env(key, value);
    }
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        process.process_group(0);
    }

    tracing::debug!(command = %command, host = %target.host, "running remote command");
    let child = process.spawn().map_err(|e| io_error(command, e))?;
    let mut session = Session {
        child,
        reaped: false,
    };

    let stdout = session
        .child
        .stdout
        .take()
        .ok_or_else(|| io_error(command, std::io::Error::other("missing stdout pipe")))?;
    let stderr = session
        .child
        .stderr
        .take()
        .ok_or_else(|| io_error(command, std::io::Error::other("missing stderr pipe")))?;

    let captured = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&captured);
    let (stdout_done_tx, stdout_done_rx) = mpsc::channel::<()>();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else {
                break;
            };
            if let Ok(mut lines) = sink.lock() {
                lines.push(line);
            }
        }
        let _ = stdout_done_tx.send(());
    });
    let (stderr_tx, stderr_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let mut raw = Vec::new();
        if let Err(err) = BufReader::new(stderr).read_to_end(&mut raw) {
            tracing::debug!(error = %err, "failed to read ssh stderr");
        }
        let buf = String::from_utf8_lossy(&raw).into_owned();
        let _ = stderr_tx.send(buf);
    });

    let start = Instant::now();
    let status = loop {
        match session.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= options.wait_ceiling {
                    break None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => return Err(io_error(command, err)),
        }
    };
    session.close();

    // Readers finish at EOF, which a surviving holder of the pipes can delay
    // forever. Past the grace period they are left detached and whatever was
    // captured so far is used.
    let drain_deadline = Instant::now() + READER_GRACE;
    if stdout_done_rx
        .recv_timeout(drain_deadline.saturating_duration_since(Instant::now()))
        .is_err()
    {
        tracing::debug!(command = %command, "ssh stdout still open; using captured lines");
    }
    let stderr = stderr_rx
        .recv_timeout(drain_deadline.saturating_duration_since(Instant::now()))
        .unwrap_or_default();
    let lines = captured
        .lock()
        .map(|lines| lines.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

    let exit_code = status.map(|s| s.code().unwrap_or(-1));
    if exit_code == Some(SSH_TRANSPORT_FAILURE_EXIT) {
        tracing::warn!(
            host = %target.host,
            stderr = %stderr.trim(),
            "ssh connection or authentication failed"
        );
        return Err(SourceError::AuthenticationFailed {
            host: target.host.clone(),
        });
    }
    if status.is_none() {
        tracing::warn!(
            command = %command,
            host = %target.host,
            waited_ms = u64::try_from(options.wait_ceiling.as_millis()).unwrap_or(u64::MAX),
            "remote command did not report an exit status in time; using captured output"
        );
    }

    Ok(RemoteOutcome {
        output: join_lines(lines),
        exit_code,
        timed_out: status.is_none(),
    })
}
