use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use super::{DatabaseError, StorageContext};
use crate::config::DbConfig;

/// The single database handle, passed explicitly to repositories and
/// controllers.
///
/// The connection is owned here and lives until [`Database::close`] or drop.
/// Every accessor fails with [`DatabaseError::ConnectionClosed`] after close.
#[derive(Debug)]
pub struct Database {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database described by `config` and bring the
    /// schema up to date.
    pub fn open(config: &DbConfig) -> Result<Self, DatabaseError> {
        let conn = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|source| DatabaseError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                Connection::open(path)?
            }
            None => Connection::open_in_memory()?,
        };
        configure_pragmas(&conn, config)?;
        run_migrations(&conn)?;
        tracing::info!(
            path = %config.path.as_deref().map_or("<memory>".into(), |p| p.display().to_string()),
            "Database opened"
        );
        Ok(Self {
            conn: Some(conn),
            path: config.path.clone(),
        })
    }

    /// Open a file-backed database with default settings.
    pub fn open_path(path: &Path) -> Result<Self, DatabaseError> {
        Self::open(&DbConfig::at(path))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open(&DbConfig::in_memory())
    }

    /// Borrow the live connection.
    pub fn conn(&self) -> Result<&Connection, DatabaseError> {
        self.conn.as_ref().ok_or(DatabaseError::ConnectionClosed)
    }

    pub fn ensure_open(&self) -> Result<(), DatabaseError> {
        self.conn().map(|_| ())
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// File path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), DatabaseError> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(|(_, e)| DatabaseError::Connection(e))?;
                tracing::info!("Database closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1",
                rusqlite::params![table],
                |row| row.get(0),
            )
            .storage("sqlite_master", "select")?;
        Ok(count > 0)
    }

    /// Count tables in the database (for verification)
    pub fn count_tables(&self) -> Result<i64, DatabaseError> {
        count_tables(self.conn()?)
    }

    /// Highest applied migration. Unlike the migration runner, a missing or
    /// unreadable `schema_version` table is an error here.
    pub fn schema_version(&self) -> Result<i64, DatabaseError> {
        let version = self
            .conn()?
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .storage("schema_version", "select")?;
        Ok(version.unwrap_or(0))
    }
}

fn configure_pragmas(conn: &Connection, config: &DbConfig) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Apply every schema script newer than the recorded version.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::SchemaInit {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, Option<i64>>(0),
    )
    .ok()
    .flatten()
    .unwrap_or(0)
}

fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )
    .storage("sqlite_master", "select")
}
