use super::{io_error, Environment, SourceError};
use crate::shared::join_lines;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

/// Splits a command string into program and arguments on whitespace. No
/// shell is involved, so quoting and globbing are not interpreted.
pub fn tokenize_command(command: &str) -> Vec<&str> {
    command.split_whitespace().collect()
}

pub(crate) fn build_command(command: &str, env: &Environment) -> Result<Command, SourceError> {
    let tokens = tokenize_command(command);
    let Some((program, args)) = tokens.split_first() else {
        return Err(io_error(
            command,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        ));
    };

    let mut process = Command::new(program);
    process.args(args).env_clear();
    for (key, value) in env.iter() {
        process.env(key, value);
    }
    Ok(process)
}

/// Runs `command` locally with exactly `env` as its environment and waits
/// for it to exit.
///
/// Standard output lines are joined with `,`; no output yields `None`. A
/// non-zero exit is reported as [`SourceError::ExecutionFailed`] carrying the
/// captured standard error. Spawn and pipe faults are [`SourceError::Io`].
pub fn run_local_command(command: &str, env: &Environment) -> Result<Option<String>, SourceError> {
    let mut process = build_command(command, env)?;
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(command = %command, env_vars = env.len(), "running local command");
    let mut child = process.spawn().map_err(|e| io_error(command, e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_error(command, std::io::Error::other("missing stdout pipe")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_error(command, std::io::Error::other("missing stderr pipe")))?;

    let stdout_reader = thread::spawn(move || {
        BufReader::new(stdout)
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
    });
    let stderr_reader = thread::spawn(move || {
        let mut raw = Vec::new();
        if let Err(err) = BufReader::new(stderr).read_to_end(&mut raw) {
            tracing::debug!(error = %err, "failed to read command stderr");
        }
        String::from_utf8_lossy(&raw).into_owned()
    });

    let status = child.wait().map_err(|e| io_error(command, e))?;
    let lines = stdout_reader
        .join()
        .map_err(|_| io_error(command, std::io::Error::other("stdout reader panicked")))?
        .map_err(|e| io_error(command, e))?;
    let stderr = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(SourceError::ExecutionFailed {
            command: command.to_string(),
            exit_code: status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(join_lines(lines))
}
