use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "clinic.db";

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "CLINIC_DATA_DIR";
/// Overrides the database file path (takes precedence over the data dir).
pub const DB_PATH_ENV: &str = "CLINIC_DB_PATH";

/// Default busy timeout for the SQLite connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Get the application data directory: `$CLINIC_DATA_DIR`, else `~/Clinic/`.
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the database path: `$CLINIC_DB_PATH`, else `<data dir>/clinic.db`.
pub fn database_path() -> PathBuf {
    std::env::var_os(DB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join(DB_FILE_NAME))
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "clinic_lib=debug,warn"
    } else {
        "clinic_lib=info,warn"
    }
}

/// Connection settings for [`Database::open`](crate::db::Database::open).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: None,
            foreign_keys: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl DbConfig {
    /// File-backed config at the resolved [`database_path`].
    pub fn from_env() -> Self {
        Self {
            path: Some(database_path()),
            ..Self::default()
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }
}
