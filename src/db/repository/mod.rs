//! Repository layer: one generic set of CRUD operations over every table.
//!
//! A table opts in by implementing [`Entity`]. The per-entity modules supply
//! field validation and integrity hooks; the functions here own the SQL.
//!
//! Every write runs in the same order: field checks, then reference and
//! uniqueness pre-checks, then the statement itself.

mod appointment;
mod employee;
pub mod integrity;
mod patient;
mod role;
mod room;

use rusqlite::{Connection, OptionalExtension, Row};

use super::{Database, DatabaseError, StorageContext};
use crate::query::{
    build_filters, validate_filters_and_sorting, FilterDescriptor, Page, SortDescriptor,
    ValidatedQuery, Value,
};

pub use appointment::*;
pub use employee::*;
pub use integrity::*;
pub use patient::*;
pub use role::*;
pub use room::*;

/// A table row with an integer primary key.
pub trait Entity: Sized {
    /// Human-readable name used in errors and logs.
    const NAME: &'static str;
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Every column, primary key first. Doubles as the filter/sort whitelist.
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<i64>;

    /// Read a row selected with [`Entity::COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Writable columns and their values, primary key excluded.
    fn values(&self) -> Vec<(&'static str, Value)>;

    fn validate_fields(&self) -> Result<(), DatabaseError>;

    /// Foreign-key and uniqueness pre-checks. `exclude_id` is the row being
    /// updated, so it does not collide with itself.
    fn validate_references(
        &self,
        _conn: &Connection,
        _exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        Ok(())
    }

    /// Refuse deletion while other rows depend on `id`.
    fn validate_delete(_conn: &Connection, _id: i64) -> Result<(), DatabaseError> {
        Ok(())
    }
}

fn select_sql<E: Entity>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

// ═══════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════

/// Validate and insert `entity`, returning the new row id. Any id already set
/// on `entity` is ignored.
pub fn insert<E: Entity>(conn: &Connection, entity: &E) -> Result<i64, DatabaseError> {
    entity.validate_fields()?;
    entity.validate_references(conn, None)?;
    if let Some(preset) = entity.id() {
        tracing::debug!(entity = E::NAME, preset, "Ignoring preset id on insert");
    }

    let values = entity.values();
    let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        columns.join(", "),
        vec!["?"; values.len()].join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(values.iter().map(|(_, v)| v)))
        .storage(E::TABLE, "insert")?;

    let id = conn.last_insert_rowid();
    tracing::info!(entity = E::NAME, id, "Inserted");
    Ok(id)
}

/// Replace every writable column of row `id` with the values in `entity`.
pub fn update<E: Entity>(conn: &Connection, id: i64, entity: &E) -> Result<(), DatabaseError> {
    entity.validate_fields()?;
    ensure_exists::<E>(conn, id)?;
    entity.validate_references(conn, Some(id))?;

    let values = entity.values();
    let assignments: Vec<String> = values.iter().map(|(c, _)| format!("{c} = ?")).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        E::TABLE,
        assignments.join(", "),
        E::PRIMARY_KEY
    );
    let params: Vec<Value> = values
        .into_iter()
        .map(|(_, v)| v)
        .chain(std::iter::once(Value::Integer(id)))
        .collect();
    conn.execute(&sql, rusqlite::params_from_iter(params.iter()))
        .storage(E::TABLE, "update")?;

    tracing::info!(entity = E::NAME, id, "Updated");
    Ok(())
}

/// Delete row `id`; `NotFound` when it does not exist.
pub fn delete<E: Entity>(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    ensure_exists::<E>(conn, id)?;
    E::validate_delete(conn, id)?;

    let sql = format!("DELETE FROM {} WHERE {} = ?1", E::TABLE, E::PRIMARY_KEY);
    conn.execute(&sql, rusqlite::params![id])
        .storage(E::TABLE, "delete")?;

    tracing::info!(entity = E::NAME, id, "Deleted");
    Ok(())
}

// ═══════════════════════════════════════════
// Reads
// ═══════════════════════════════════════════

pub fn find<E: Entity>(conn: &Connection, id: i64) -> Result<Option<E>, DatabaseError> {
    let sql = format!("{} WHERE {} = ?1", select_sql::<E>(), E::PRIMARY_KEY);
    conn.query_row(&sql, rusqlite::params![id], E::from_row)
        .optional()
        .storage(E::TABLE, "select")
}

pub fn get<E: Entity>(conn: &Connection, id: i64) -> Result<E, DatabaseError> {
    find::<E>(conn, id)?.ok_or_else(|| DatabaseError::not_found(E::NAME, id))
}

/// Rows matching `filters`, ordered by `sort_by`. Column names are checked
/// against [`Entity::COLUMNS`].
pub fn list<E: Entity>(
    conn: &Connection,
    filters: Option<&[FilterDescriptor]>,
    sort_by: Option<&[SortDescriptor]>,
) -> Result<Vec<E>, DatabaseError> {
    let query = validate_filters_and_sorting(filters, sort_by, E::COLUMNS)?;
    list_validated(conn, &query)
}

pub fn list_page<E: Entity>(
    conn: &Connection,
    filters: Option<&[FilterDescriptor]>,
    sort_by: Option<&[SortDescriptor]>,
    page: Page,
) -> Result<Vec<E>, DatabaseError> {
    let query = validate_filters_and_sorting(filters, sort_by, E::COLUMNS)?.with_page(page);
    list_validated(conn, &query)
}

pub fn list_validated<E: Entity>(
    conn: &Connection,
    query: &ValidatedQuery,
) -> Result<Vec<E>, DatabaseError> {
    let built = build_filters(query);
    let sql = format!("{} WHERE {}", select_sql::<E>(), built.clause);
    tracing::debug!(entity = E::NAME, sql = %sql, params = built.params.len(), "List");

    let mut stmt = conn.prepare(&sql).storage(E::TABLE, "select")?;
    let rows = stmt
        .query_map(built.bind(), E::from_row)
        .storage(E::TABLE, "select")?;
    rows.map(|r| r.storage(E::TABLE, "select")).collect()
}

pub fn count<E: Entity>(
    conn: &Connection,
    filters: Option<&[FilterDescriptor]>,
) -> Result<i64, DatabaseError> {
    let query = validate_filters_and_sorting(filters, None, E::COLUMNS)?;
    let built = build_filters(&query);
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", E::TABLE, built.clause);
    conn.query_row(&sql, built.bind(), |row| row.get(0))
        .storage(E::TABLE, "count")
}

pub fn exists<E: Entity>(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    integrity::row_exists::<E>(conn, id)
}

// ═══════════════════════════════════════════
// Handle
// ═══════════════════════════════════════════

/// The generic operations bound to one [`Database`] and one entity type.
///
/// Every call checks that the database is still open.
pub struct Repository<'db, E> {
    db: &'db Database,
    _entity: std::marker::PhantomData<E>,
}

impl<'db, E: Entity> Repository<'db, E> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            _entity: std::marker::PhantomData,
        }
    }

    pub fn insert(&self, entity: &E) -> Result<i64, DatabaseError> {
        insert(self.db.conn()?, entity)
    }

    pub fn get(&self, id: i64) -> Result<E, DatabaseError> {
        get(self.db.conn()?, id)
    }

    pub fn find(&self, id: i64) -> Result<Option<E>, DatabaseError> {
        find(self.db.conn()?, id)
    }

    pub fn list(
        &self,
        filters: Option<&[FilterDescriptor]>,
        sort_by: Option<&[SortDescriptor]>,
    ) -> Result<Vec<E>, DatabaseError> {
        list(self.db.conn()?, filters, sort_by)
    }

    pub fn list_page(
        &self,
        filters: Option<&[FilterDescriptor]>,
        sort_by: Option<&[SortDescriptor]>,
        page: Page,
    ) -> Result<Vec<E>, DatabaseError> {
        list_page(self.db.conn()?, filters, sort_by, page)
    }

    pub fn count(&self, filters: Option<&[FilterDescriptor]>) -> Result<i64, DatabaseError> {
        count::<E>(self.db.conn()?, filters)
    }

    pub fn update(&self, id: i64, entity: &E) -> Result<(), DatabaseError> {
        update(self.db.conn()?, id, entity)
    }

    pub fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        delete::<E>(self.db.conn()?, id)
    }

    pub fn exists(&self, id: i64) -> Result<bool, DatabaseError> {
        exists::<E>(self.db.conn()?, id)
    }
}
