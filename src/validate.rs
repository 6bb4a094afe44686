use crate::parameter::{ParameterSpec, ParameterType, RemoteTarget, ValueSource, Which};
use crate::resolve::ResolveContext;
use crate::shared::is_blank;
use crate::source::{
    load_properties, read_location, run_database_query, run_local_command, run_remote_command,
    DriverRegistry, Environment, SourceError, SshOptions,
};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const SSH_PORT: u16 = 22;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration-time feedback. Never changes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ok,
    Warning(String),
    Error(String),
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning(_) => "warning",
            Self::Error(_) => "error",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::Warning(message) | Self::Error(message) => Some(message.as_str()),
        }
    }
}

impl std::fmt::Display for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {message}", self.status()),
            None => write!(f, "{}", self.status()),
        }
    }
}

/// Checks that a property file loads and, for single-level types, that the
/// key is present.
pub fn check_property_file(
    location: &str,
    key: &str,
    parameter_type: ParameterType,
) -> Validation {
    if is_blank(location) {
        return Validation::Ok;
    }
    let properties = match load_properties(location) {
        Ok(properties) => properties,
        Err(err) => {
            tracing::debug!(location = %location, error = %err, "property file check failed");
            return Validation::Warning(format!("The property file {location} doesn't exist"));
        }
    };
    if parameter_type.is_multi_level() {
        return Validation::Ok;
    }
    if is_blank(key) {
        return Validation::Warning(format!(
            "The property file {location} exists but no property key was provided"
        ));
    }
    if properties.get(key).is_some() {
        Validation::Ok
    } else {
        Validation::Warning(format!(
            "The property file {location} exists but the property key {key} is invalid"
        ))
    }
}

/// Runs the command locally and reports a non-zero exit with its standard
/// error.
pub fn check_command(command: &str, env: &Environment) -> Validation {
    if is_blank(command) {
        return Validation::Ok;
    }
    match run_local_command(command, env) {
        Ok(_) => Validation::Ok,
        Err(SourceError::ExecutionFailed { stderr, .. }) => Validation::Error(stderr),
        Err(err) => Validation::Error(err.to_string()),
    }
}

pub fn check_remote_command(
    command: &str,
    target: &RemoteTarget,
    env: &Environment,
    options: &SshOptions,
) -> Validation {
    if is_blank(command) {
        return Validation::Ok;
    }
    match run_remote_command(command, target, env, options) {
        Ok(outcome) if outcome.succeeded() => Validation::Ok,
        Ok(outcome) => match outcome.timeout_error(command, options) {
            Some(timeout) => Validation::Warning(timeout.to_string()),
            None => Validation::Error(format!("Command: {command}, failed on: {}", target.host)),
        },
        Err(SourceError::AuthenticationFailed { host }) => {
            Validation::Error(format!("Authentication failed with {host}"))
        }
        Err(err) => Validation::Error(err.to_string()),
    }
}

/// Checks that something accepts TCP connections on the ssh port.
pub fn check_ssh_hostname(host: &str) -> Validation {
    if is_blank(host) {
        return Validation::Ok;
    }
    let addrs = match (host.trim(), SSH_PORT).to_socket_addrs() {
        Ok(addrs) => addrs.collect::<Vec<_>>(),
        Err(err) => return Validation::Error(err.to_string()),
    };
    if addrs.is_empty() {
        return Validation::Error(format!("Host {host} not found"));
    }

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(_stream) => return Validation::Ok,
            Err(err) => last_error = Some(err),
        }
    }
    match last_error {
        Some(err) => Validation::Error(err.to_string()),
        None => Validation::Error(format!("Host {host} not found")),
    }
}

pub fn check_db_driver(url: &str, driver: &str, drivers: &DriverRegistry) -> Validation {
    if is_blank(url) {
        return Validation::Ok;
    }
    if is_blank(driver) {
        return Validation::Error("Driver must be set.".to_string());
    }
    match drivers.get(driver) {
        Ok(_) => Validation::Ok,
        Err(err) => Validation::Error(err.to_string()),
    }
}

pub fn check_db_request(driver: &str, request: &str, request_file: &str) -> Validation {
    if is_blank(driver) {
        return Validation::Ok;
    }
    match (is_blank(request), is_blank(request_file)) {
        (true, true) => Validation::Error("Request must be set.".to_string()),
        (false, false) => {
            Validation::Error("Request and request file must not both be set".to_string())
        }
        (true, false) => match read_location(request_file) {
            Ok(_) => Validation::Ok,
            Err(err) => Validation::Error(err.to_string()),
        },
        (false, true) => Validation::Ok,
    }
}

/// Validation twin of [`crate::resolve::resolve`]: consults the same active
/// source but reports failures instead of collapsing them to no value.
pub fn check_resolution(spec: &ParameterSpec, which: Which, ctx: &ResolveContext) -> Validation {
    let Some(source) = spec.sources(which).active() else {
        return Validation::Ok;
    };
    match source {
        ValueSource::PropertyFile { location, key } => {
            check_property_file(&location, &key, spec.parameter_type)
        }
        ValueSource::Literal(_) => Validation::Ok,
        ValueSource::Command(command) => check_command(&command, &ctx.environment),
        ValueSource::RemoteCommand { command, target } => {
            check_remote_command(&command, &target, &ctx.environment, &ctx.ssh)
        }
        ValueSource::Database(database) => match run_database_query(&database, &ctx.drivers) {
            Ok(_) => Validation::Ok,
            Err(err) => Validation::Error(err.to_string()),
        },
    }
}

/// Runs every check that applies to one slot of `spec`, labelled by check
/// name. Each configured command runs once: when the active source is a
/// command, the command check stands in for the resolution check.
pub fn validate_slot(
    spec: &ParameterSpec,
    which: Which,
    ctx: &ResolveContext,
) -> Vec<(&'static str, Validation)> {
    let sources = spec.sources(which);
    let mut results = vec![(
        "property_file",
        check_property_file(
            &sources.property_file,
            &sources.property_key,
            spec.parameter_type,
        ),
    )];

    if is_blank(&sources.ssh.host) {
        results.push(("command", check_command(&sources.command, &ctx.environment)));
    } else {
        results.push(("ssh_hostname", check_ssh_hostname(&sources.ssh.host)));
        results.push((
            "remote_command",
            check_remote_command(
                &sources.command,
                &sources.ssh.target(),
                &ctx.environment,
                &ctx.ssh,
            ),
        ));
    }

    let database = &sources.database;
    results.push((
        "db_driver",
        check_db_driver(&database.url, &database.driver, &ctx.drivers),
    ));
    results.push((
        "db_request",
        check_db_request(&database.driver, &database.query, &database.query_url),
    ));

    let command_already_ran = matches!(
        sources.active(),
        Some(ValueSource::Command(_) | ValueSource::RemoteCommand { .. })
    );
    if !command_already_ran {
        results.push(("resolution", check_resolution(spec, which, ctx)));
    }
    results
}
