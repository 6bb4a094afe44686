use super::{read_location, SourceError};
use crate::parameter::{DatabaseSource, QuerySource};
use crate::shared::is_blank;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An open database session able to run a query and report the first
/// column of every row, in row order. `None` marks SQL `NULL`.
pub trait DatabaseConnection {
    fn first_column(&mut self, query: &str) -> Result<Vec<Option<String>>, SourceError>;
}

pub trait DatabaseDriver: Send + Sync {
    fn connect(
        &self,
        url: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn DatabaseConnection>, SourceError>;
}

/// Drivers addressable by name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn DatabaseDriver>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DriverRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the bundled SQLite driver under `sqlite` and its JDBC
    /// class name `org.sqlite.JDBC`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        let sqlite: Arc<dyn DatabaseDriver> = Arc::new(SqliteDriver);
        registry.register_shared("sqlite", Arc::clone(&sqlite));
        registry.register_shared("org.sqlite.JDBC", sqlite);
        registry
    }

    pub fn register<D: DatabaseDriver + 'static>(&mut self, name: &str, driver: D) {
        self.register_shared(name, Arc::new(driver));
    }

    pub fn register_shared(&mut self, name: &str, driver: Arc<dyn DatabaseDriver>) {
        self.drivers.insert(name.trim().to_string(), driver);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DatabaseDriver>, SourceError> {
        self.drivers
            .get(name.trim())
            .cloned()
            .ok_or_else(|| SourceError::DriverNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.contains_key(name.trim())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }
}

/// Runs the configured query and returns the first column of the last row
/// visited. Earlier rows are discarded; no rows or a `NULL` last value
/// yields `None`.
pub fn run_database_query(
    source: &DatabaseSource,
    drivers: &DriverRegistry,
) -> Result<Option<String>, SourceError> {
    let driver = drivers.get(&source.driver)?;
    let query = match &source.query {
        QuerySource::Inline(query) => query.clone(),
        QuerySource::Url(location) => read_location(location)?,
    };
    if is_blank(&query) {
        return Err(SourceError::Database {
            url: source.url.clone(),
            reason: "no query configured".to_string(),
        });
    }

    let mut connection = driver.connect(&source.url, &source.user, &source.password)?;
    let rows = connection.first_column(&query)?;
    tracing::debug!(url = %source.url, rows = rows.len(), "database query finished");

    let mut result = None;
    for value in rows {
        result = value;
    }
    Ok(result)
}

/// SQLite through the bundled `rusqlite` build. Accepts `jdbc:sqlite:<path>`,
/// `sqlite:<path>`, `sqlite::memory:` or a bare path. Credentials are not
/// used by SQLite and are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn database_path(url: &str) -> &str {
        let trimmed = url.trim();
        trimmed
            .strip_prefix("jdbc:sqlite:")
            .or_else(|| trimmed.strip_prefix("sqlite://"))
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed)
    }
}

impl DatabaseDriver for SqliteDriver {
    fn connect(
        &self,
        url: &str,
        _user: &str,
        _password: &str,
    ) -> Result<Box<dyn DatabaseConnection>, SourceError> {
        let path = Self::database_path(url);
        let opened = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        };
        let connection = opened.map_err(|err| SourceError::Database {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Box::new(SqliteConnection {
            url: url.to_string(),
            connection,
        }))
    }
}

struct SqliteConnection {
    url: String,
    connection: Connection,
}

impl SqliteConnection {
    fn sql_error(&self, err: rusqlite::Error) -> SourceError {
        SourceError::Database {
            url: self.url.clone(),
            reason: err.to_string(),
        }
    }
}

impl DatabaseConnection for SqliteConnection {
    fn first_column(&mut self, query: &str) -> Result<Vec<Option<String>>, SourceError> {
        let mut statement = self
            .connection
            .prepare(query)
            .map_err(|err| self.sql_error(err))?;
        let mut rows = statement.query([]).map_err(|err| self.sql_error(err))?;

        let mut values = Vec::new();
        while let Some(row) = rows.next().map_err(|err| self.sql_error(err))? {
            let value = row.get_ref(0).map_err(|err| self.sql_error(err))?;
            values.push(column_text(value));
        }
        Ok(values)
    }
}

fn column_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        // Whole-number reals keep their `.0`.
        ValueRef::Real(f) => Some(format!("{f:?}")),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
