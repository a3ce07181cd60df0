//! Clinic data layer: validated CRUD over a single SQLite database.
//!
//! Filters and sort orders arrive as data ([`query::FilterDescriptor`],
//! [`query::SortDescriptor`]), are checked against a per-table column
//! whitelist and turned into parameterized SQL. Repositories add field
//! validation and referential pre-checks; controllers translate failures
//! into [`controller::ClinicError`].

pub mod config;
pub mod controller;
pub mod db;
pub mod models;
pub mod query;
pub mod validation;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// build-dependent default. Later calls are no-ops.
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("{} data layer v{}", config::APP_NAME, config::APP_VERSION);
    }
}

/// Open the database at the configured location (see [`config::DbConfig::from_env`]).
pub fn open_default() -> Result<db::Database, db::DatabaseError> {
    db::Database::open(&config::DbConfig::from_env())
}
