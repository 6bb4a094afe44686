use std::collections::BTreeMap;

pub mod database;
pub mod fetch;
pub mod local_command;
pub mod properties;
pub mod remote_command;

pub use database::{
    run_database_query, DatabaseConnection, DatabaseDriver, DriverRegistry, SqliteDriver,
};
pub use fetch::read_location;
pub use local_command::run_local_command;
pub use properties::{load_properties, lookup_property, Properties};
pub use remote_command::{run_remote_command, RemoteOutcome, SshOptions, REMOTE_WAIT_CEILING};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {location}: {reason}")]
    Fetch { location: String, reason: String },
    #[error("`{location}` is neither an existing file nor a valid url: {reason}")]
    InvalidUrl { location: String, reason: String },
    #[error("unsupported url scheme `{scheme}` in {location}")]
    UnsupportedScheme { location: String, scheme: String },
    #[error("key `{key}` not found in {location}")]
    MissingKey { location: String, key: String },
    #[error("database driver `{0}` is not registered")]
    DriverNotFound(String),
    #[error("database error for {url}: {reason}")]
    Database { url: String, reason: String },
    #[error("authentication failed with {host}")]
    AuthenticationFailed { host: String },
    #[error("command `{command}` exited with status {exit_code}: {stderr}")]
    ExecutionFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
    #[error("command `{command}` did not report an exit status within {waited_ms}ms")]
    Timeout { command: String, waited_ms: u64 },
    #[error("io error running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// True for the family of failures that mean "the source could not be
    /// reached or did not hold the value" as opposed to execution faults.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::InvalidUrl { .. }
                | Self::UnsupportedScheme { .. }
                | Self::MissingKey { .. }
                | Self::DriverNotFound(_)
                | Self::Database { .. }
                | Self::AuthenticationFailed { .. }
        )
    }
}

pub(crate) fn io_error(command: &str, source: std::io::Error) -> SourceError {
    SourceError::Io {
        command: command.to_string(),
        source,
    }
}

/// Immutable snapshot of environment variables forwarded to spawned
/// processes. Captured once and passed in explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshots the current process environment. Variables that are not
    /// valid unicode are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
