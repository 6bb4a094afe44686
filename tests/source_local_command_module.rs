use choiceparam::source::{run_local_command, Environment, SourceError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn path_env() -> Environment {
    Environment::empty().with("PATH", std::env::var("PATH").unwrap_or_default())
}

#[test]
fn stdout_lines_are_joined_with_commas() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("list-envs");
    write_script(&script, "#!/bin/sh\nprintf 'dev\\nqa\\nprod\\n'\n");

    let value = run_local_command(&script.display().to_string(), &path_env()).expect("run");
    assert_eq!(value, Some("dev,qa,prod".to_string()));
}

#[test]
fn arguments_are_split_on_whitespace() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("args");
    write_script(&script, "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\"; done\n");

    let command = format!("{}  one   two", script.display());
    let value = run_local_command(&command, &path_env()).expect("run");
    assert_eq!(value, Some("one,two".to_string()));
}

#[test]
fn only_the_given_environment_is_forwarded() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("env-probe");
    write_script(
        &script,
        "#!/bin/sh\necho \"greeting=${GREETING:-unset}\"\necho \"home=${HOME:-unset}\"\n",
    );

    let env = Environment::empty().with("GREETING", "hello");
    let value = run_local_command(&script.display().to_string(), &env).expect("run");
    assert_eq!(value, Some("greeting=hello,home=unset".to_string()));
}

#[test]
fn no_output_is_no_value() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("quiet");
    write_script(&script, "#!/bin/sh\nexit 0\n");

    let value = run_local_command(&script.display().to_string(), &path_env()).expect("run");
    assert_eq!(value, None);
}

#[test]
fn non_zero_exit_carries_stderr() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("fails");
    write_script(&script, "#!/bin/sh\necho partial\necho 'boom' 1>&2\nexit 3\n");

    let err = run_local_command(&script.display().to_string(), &path_env()).expect_err("fail");
    match err {
        SourceError::ExecutionFailed {
            exit_code, stderr, ..
        } => {
            assert_eq!(exit_code, 3);
            assert_eq!(stderr.trim(), "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn undecodable_stderr_still_reaches_the_failure() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("fails");
    write_script(&script, "#!/bin/sh\nprintf '\\377 table locked\\n' 1>&2\nexit 1\n");

    let err = run_local_command(&script.display().to_string(), &path_env()).expect_err("fail");
    match err {
        SourceError::ExecutionFailed { stderr, .. } => {
            assert!(stderr.contains("table locked"), "stderr was {stderr:?}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_program_is_an_io_fault() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("not-installed");
    let err = run_local_command(&missing.display().to_string(), &path_env()).expect_err("fail");
    assert!(matches!(err, SourceError::Io { .. }));
}
