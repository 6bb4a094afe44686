use choiceparam::parameter::{DatabaseSource, QuerySource};
use choiceparam::source::{run_database_query, DriverRegistry, SourceError};
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn seed(path: &Path, names: &[&str]) {
    let connection = Connection::open(path).expect("open");
    connection
        .execute_batch("CREATE TABLE releases (id INTEGER PRIMARY KEY, name TEXT);")
        .expect("schema");
    for name in names {
        connection
            .execute("INSERT INTO releases (name) VALUES (?1)", [name])
            .expect("insert");
    }
}

fn source(url: String, query: QuerySource) -> DatabaseSource {
    DatabaseSource {
        driver: "org.sqlite.JDBC".to_string(),
        url,
        user: "reader".to_string(),
        password: "ignored".to_string(),
        query,
    }
}

#[test]
fn last_row_of_first_column_is_the_value() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("releases.db");
    seed(&db, &["x", "y", "z"]);

    let value = run_database_query(
        &source(
            format!("jdbc:sqlite:{}", db.display()),
            QuerySource::Inline("SELECT name FROM releases ORDER BY id".to_string()),
        ),
        &DriverRegistry::with_builtin(),
    )
    .expect("query");
    assert_eq!(value, Some("z".to_string()));
}

#[test]
fn empty_result_is_no_value() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("releases.db");
    seed(&db, &[]);

    let value = run_database_query(
        &source(
            format!("sqlite:{}", db.display()),
            QuerySource::Inline("SELECT name FROM releases".to_string()),
        ),
        &DriverRegistry::with_builtin(),
    )
    .expect("query");
    assert_eq!(value, None);
}

#[test]
fn query_can_come_from_a_file() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("releases.db");
    seed(&db, &["1.0", "1.1"]);
    let query_file = dir.path().join("latest.sql");
    fs::write(&query_file, "SELECT name FROM releases ORDER BY id").expect("write query");

    let value = run_database_query(
        &source(
            db.display().to_string(),
            QuerySource::Url(query_file.display().to_string()),
        ),
        &DriverRegistry::with_builtin(),
    )
    .expect("query");
    assert_eq!(value, Some("1.1".to_string()));
}

#[test]
fn bad_sql_is_a_database_error() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("releases.db");
    seed(&db, &["x"]);

    let err = run_database_query(
        &source(
            db.display().to_string(),
            QuerySource::Inline("SELECT nope FROM missing_table".to_string()),
        ),
        &DriverRegistry::with_builtin(),
    )
    .expect_err("sql error");
    assert!(matches!(err, SourceError::Database { .. }));
}

#[test]
fn missing_database_file_is_not_created() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("absent.db");

    let err = run_database_query(
        &source(
            db.display().to_string(),
            QuerySource::Inline("SELECT 1".to_string()),
        ),
        &DriverRegistry::with_builtin(),
    )
    .expect_err("open error");
    assert!(matches!(err, SourceError::Database { .. }));
    assert!(!db.exists());
}
