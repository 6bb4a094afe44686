use choiceparam::parameter::{RemoteTarget, SshCredential};
use choiceparam::source::{run_remote_command, Environment, SourceError, SshOptions};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn options(binary: &Path, ceiling: Duration) -> SshOptions {
    SshOptions {
        binary: binary.display().to_string(),
        wait_ceiling: ceiling,
        extra_args: Vec::new(),
    }
}

fn target(credential: SshCredential) -> RemoteTarget {
    RemoteTarget {
        host: "build-01".to_string(),
        user: "ci".to_string(),
        credential,
    }
}

fn env() -> Environment {
    Environment::empty().with("PATH", std::env::var("PATH").unwrap_or_default())
}

#[test]
fn output_lines_are_joined_and_arguments_passed() {
    let dir = tempdir().expect("tempdir");
    let args_log = dir.path().join("args.log");
    let ssh = dir.path().join("fake-ssh");
    write_script(
        &ssh,
        &format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\necho alpha\necho beta\n",
            args_log.display()
        ),
    );

    let outcome = run_remote_command(
        "ls /srv/releases",
        &target(SshCredential::Password("pw".to_string())),
        &env(),
        &options(&ssh, Duration::from_secs(5)),
    )
    .expect("run");

    assert_eq!(outcome.output, Some("alpha,beta".to_string()));
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.succeeded());

    let args = fs::read_to_string(&args_log).expect("args");
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args[args.len() - 4..], ["-l", "ci", "build-01", "ls /srv/releases"]);
}

#[test]
fn password_reaches_askpass_through_environment() {
    let dir = tempdir().expect("tempdir");
    let ssh = dir.path().join("fake-ssh");
    write_script(&ssh, "#!/bin/sh\n\"$SSH_ASKPASS\"\n");

    let outcome = run_remote_command(
        "true",
        &target(SshCredential::Password("s3cret".to_string())),
        &env(),
        &options(&ssh, Duration::from_secs(5)),
    )
    .expect("run");
    assert_eq!(outcome.output, Some("s3cret".to_string()));
}

#[test]
fn private_key_is_passed_as_identity_file() {
    let dir = tempdir().expect("tempdir");
    let ssh = dir.path().join("fake-ssh");
    write_script(
        &ssh,
        "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-i\" ]; then cat \"$2\"; fi\n  shift\ndone\n",
    );

    let outcome = run_remote_command(
        "true",
        &target(SshCredential::PrivateKey("KEY-MATERIAL".to_string())),
        &env(),
        &options(&ssh, Duration::from_secs(5)),
    )
    .expect("run");
    assert_eq!(outcome.output, Some("KEY-MATERIAL".to_string()));
}

#[test]
fn transport_failure_is_authentication_failure() {
    let dir = tempdir().expect("tempdir");
    let ssh = dir.path().join("fake-ssh");
    write_script(&ssh, "#!/bin/sh\necho 'Permission denied' 1>&2\nexit 255\n");

    let err = run_remote_command(
        "true",
        &target(SshCredential::Password("wrong".to_string())),
        &env(),
        &options(&ssh, Duration::from_secs(5)),
    )
    .expect_err("auth");
    match err {
        SourceError::AuthenticationFailed { host } => assert_eq!(host, "build-01"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_zero_exit_keeps_output() {
    let dir = tempdir().expect("tempdir");
    let ssh = dir.path().join("fake-ssh");
    write_script(&ssh, "#!/bin/sh\necho partial\nexit 2\n");

    let outcome = run_remote_command(
        "false",
        &target(SshCredential::Password("pw".to_string())),
        &env(),
        &options(&ssh, Duration::from_secs(5)),
    )
    .expect("run");
    assert_eq!(outcome.exit_code, Some(2));
    assert_eq!(outcome.output, Some("partial".to_string()));
    assert!(!outcome.succeeded());
}

#[test]
fn wait_ceiling_returns_captured_output() {
    let dir = tempdir().expect("tempdir");
    let ssh = dir.path().join("fake-ssh");
    write_script(&ssh, "#!/bin/sh\necho early\nsleep 30\n");

    let started = Instant::now();
    let outcome = run_remote_command(
        "tail -f log",
        &target(SshCredential::Password("pw".to_string())),
        &env(),
        &options(&ssh, Duration::from_millis(300)),
    )
    .expect("soft timeout");

    assert!(
        started.elapsed() < Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );
    assert!(outcome.timed_out);
    assert_eq!(outcome.exit_code, None);
    assert_eq!(outcome.output, Some("early".to_string()));
}

#[test]
fn background_holder_of_stdout_does_not_delay_the_result() {
    let dir = tempdir().expect("tempdir");
    let ssh = dir.path().join("fake-ssh");
    write_script(&ssh, "#!/bin/sh\necho done\nsleep 5 &\nexit 0\n");

    let started = Instant::now();
    let outcome = run_remote_command(
        "deploy",
        &target(SshCredential::Password("pw".to_string())),
        &env(),
        &options(&ssh, Duration::from_secs(10)),
    )
    .expect("run");

    assert!(
        started.elapsed() < Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.output, Some("done".to_string()));
}
