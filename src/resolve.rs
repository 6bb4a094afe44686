use crate::parameter::{ParameterSpec, ParameterValue, RemoteTarget, ValueSource, Which};
use crate::shared::is_blank;
use crate::source::{
    lookup_property, run_database_query, run_local_command, run_remote_command, DriverRegistry,
    Environment, SourceError, SshOptions,
};
use indexmap::IndexSet;

/// Everything a resolution call reads from its surroundings, passed in
/// explicitly rather than read from globals.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub environment: Environment,
    pub drivers: DriverRegistry,
    pub ssh: SshOptions,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new(Environment::capture())
    }
}

impl ResolveContext {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            drivers: DriverRegistry::with_builtin(),
            ssh: SshOptions::default(),
        }
    }

    pub fn with_drivers(mut self, drivers: DriverRegistry) -> Self {
        self.drivers = drivers;
        self
    }

    pub fn with_ssh(mut self, ssh: SshOptions) -> Self {
        self.ssh = ssh;
        self
    }
}

/// Resolves the raw (unquoted) value for one slot of `spec`.
///
/// Exactly one source is consulted, picked by
/// [`crate::parameter::SourceSet::active`].
/// Property-file failures, non-zero local exits, ssh authentication
/// failures and database failures all end in `Ok(None)`; only process I/O
/// faults from the command executors are returned as errors.
pub fn resolve(
    spec: &ParameterSpec,
    which: Which,
    ctx: &ResolveContext,
) -> Result<Option<String>, SourceError> {
    let Some(source) = spec.sources(which).active() else {
        tracing::debug!(parameter = %spec.name, ?which, "no value source configured");
        return Ok(None);
    };
    tracing::debug!(parameter = %spec.name, ?which, source = source.kind(), "resolving");
    resolve_source(&source, ctx)
}

pub fn resolve_source(
    source: &ValueSource,
    ctx: &ResolveContext,
) -> Result<Option<String>, SourceError> {
    match source {
        ValueSource::PropertyFile { location, key } => Ok(resolve_property(location, key)),
        ValueSource::Literal(value) => Ok(Some(value.clone())),
        ValueSource::Command(command) => resolve_local_command(command, &ctx.environment),
        ValueSource::RemoteCommand { command, target } => {
            resolve_remote_command(command, target, ctx)
        }
        ValueSource::Database(database) => match run_database_query(database, &ctx.drivers) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::error!(
                    url = %database.url,
                    driver = %database.driver,
                    error = %err,
                    "database query failed"
                );
                Ok(None)
            }
        },
    }
}

/// Property-file lookups never fail resolution: any load or key error
/// collapses to `None`.
fn resolve_property(location: &str, key: &str) -> Option<String> {
    match lookup_property(location, key) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                location = %location,
                key = %key,
                error = %err,
                "property lookup failed; no value"
            );
            None
        }
    }
}

fn resolve_local_command(
    command: &str,
    env: &Environment,
) -> Result<Option<String>, SourceError> {
    match run_local_command(command, env) {
        Ok(output) => Ok(output),
        Err(SourceError::ExecutionFailed {
            command,
            exit_code,
            stderr,
        }) => {
            tracing::warn!(
                command = %command,
                exit_code,
                stderr = %stderr.trim(),
                "local command failed; no value"
            );
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn resolve_remote_command(
    command: &str,
    target: &RemoteTarget,
    ctx: &ResolveContext,
) -> Result<Option<String>, SourceError> {
    match run_remote_command(command, target, &ctx.environment, &ctx.ssh) {
        Ok(outcome) => {
            if let Some(code) = outcome.exit_code.filter(|code| *code != 0) {
                tracing::warn!(
                    command = %command,
                    host = %target.host,
                    exit_code = code,
                    "remote command exited non-zero"
                );
            }
            Ok(outcome.output)
        }
        Err(SourceError::AuthenticationFailed { host }) => {
            tracing::warn!(host = %host, "authentication failed; no value");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// The resolved value with quoting applied.
pub fn effective_value(
    spec: &ParameterSpec,
    ctx: &ResolveContext,
) -> Result<Option<String>, SourceError> {
    Ok(resolve(spec, Which::Value, ctx)?.map(|raw| spec.quote(raw)))
}

/// The resolved default with quoting applied.
pub fn effective_default_value(
    spec: &ParameterSpec,
    ctx: &ResolveContext,
) -> Result<Option<String>, SourceError> {
    Ok(resolve(spec, Which::Default, ctx)?.map(|raw| spec.quote(raw)))
}

/// The value used when nothing was submitted. A blank default yields `None`
/// so the caller can fall back to its own default handling.
pub fn default_parameter_value(
    spec: &ParameterSpec,
    ctx: &ResolveContext,
) -> Result<Option<ParameterValue>, SourceError> {
    let Some(raw) = resolve(spec, Which::Default, ctx)? else {
        return Ok(None);
    };
    if is_blank(&raw) {
        return Ok(None);
    }
    Ok(Some(ParameterValue::new(&spec.name, spec.quote(raw))))
}

/// Choices that start out selected: the resolved default split on `,` with
/// each piece trimmed.
pub fn default_value_map(
    spec: &ParameterSpec,
    ctx: &ResolveContext,
) -> Result<Option<IndexSet<String>>, SourceError> {
    let Some(raw) = resolve(spec, Which::Default, ctx)? else {
        return Ok(None);
    };
    if is_blank(&raw) {
        return Ok(None);
    }
    Ok(Some(
        raw.split(',')
            .filter(|piece| !piece.is_empty())
            .map(|piece| piece.trim().to_string())
            .collect(),
    ))
}
