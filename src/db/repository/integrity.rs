//! Existence and uniqueness pre-checks run before writes.
//!
//! These are advisory: the schema declares the same FOREIGN KEY and UNIQUE
//! constraints, which still fire if a check is skipped or raced.

use rusqlite::Connection;

use super::Entity;
use crate::db::{DatabaseError, StorageContext};
use crate::query::Value;

pub(crate) fn row_exists<E: Entity>(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", E::TABLE, E::PRIMARY_KEY);
    let count: i64 = conn
        .query_row(&sql, rusqlite::params![id], |row| row.get(0))
        .storage(E::TABLE, "exists")?;
    Ok(count > 0)
}

/// A foreign key on the row being written points at `E` row `id`.
pub fn validate_fk_exists<E: Entity>(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    if row_exists::<E>(conn, id)? {
        Ok(())
    } else {
        tracing::debug!(entity = E::NAME, id, "Referenced row missing");
        Err(DatabaseError::ReferencedEntityNotFound { entity: E::NAME, id })
    }
}

/// Nullable variant of [`validate_fk_exists`].
pub fn validate_optional_fk_exists<E: Entity>(
    conn: &Connection,
    id: Option<i64>,
) -> Result<(), DatabaseError> {
    id.map_or(Ok(()), |id| validate_fk_exists::<E>(conn, id))
}

/// The row targeted by an update or delete exists.
pub fn ensure_exists<E: Entity>(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    if row_exists::<E>(conn, id)? {
        Ok(())
    } else {
        tracing::debug!(entity = E::NAME, id, "Target row missing");
        Err(DatabaseError::not_found(E::NAME, id))
    }
}

/// No other `E` row already holds this combination of column values.
///
/// `exclude_id` skips the row being updated. Key columns must belong to
/// [`Entity::COLUMNS`].
pub fn validate_unique<E: Entity>(
    conn: &Connection,
    key: &[(&'static str, Value)],
    exclude_id: Option<i64>,
) -> Result<(), DatabaseError> {
    if let Some((column, _)) = key.iter().find(|(c, _)| !E::COLUMNS.contains(c)) {
        return Err(DatabaseError::validation(*column, format!("is not a column of {}", E::TABLE)));
    }
    if key.is_empty() {
        return Ok(());
    }

    let mut conditions: Vec<String> = key.iter().map(|(c, _)| format!("{c} = ?")).collect();
    let mut params: Vec<Value> = key.iter().map(|(_, v)| v.clone()).collect();
    if let Some(id) = exclude_id {
        conditions.push(format!("{} != ?", E::PRIMARY_KEY));
        params.push(Value::Integer(id));
    }

    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        E::TABLE,
        conditions.join(" AND ")
    );
    let count: i64 = conn
        .query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| row.get(0))
        .storage(E::TABLE, "unique check")?;

    if count > 0 {
        let detail = key
            .iter()
            .map(|(c, v)| format!("{c} = {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!(entity = E::NAME, %detail, "Duplicate combination rejected");
        return Err(DatabaseError::DuplicateCombination { entity: E::NAME, detail });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert, Database};
    use crate::models::{Permission, Role};

    #[test]
    fn fk_check_is_repeatable_and_read_only() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        let id = insert(conn, &Role::new("Admin")).unwrap();

        for _ in 0..3 {
            validate_fk_exists::<Role>(conn, id).unwrap();
        }
        for _ in 0..3 {
            assert!(matches!(
                validate_fk_exists::<Role>(conn, id + 100),
                Err(DatabaseError::ReferencedEntityNotFound { entity: "role", .. })
            ));
        }
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM roles", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn optional_fk_accepts_none() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        validate_optional_fk_exists::<Role>(conn, None).unwrap();
        assert!(validate_optional_fk_exists::<Role>(conn, Some(1)).is_err());
    }

    #[test]
    fn unique_check_honours_exclusion() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        let id = insert(conn, &Permission::new("manage_schedule")).unwrap();
        let key = [("name", Value::from("manage_schedule"))];

        assert!(matches!(
            validate_unique::<Permission>(conn, &key, None),
            Err(DatabaseError::DuplicateCombination { entity: "permission", .. })
        ));
        // the row itself does not count as a duplicate
        validate_unique::<Permission>(conn, &key, Some(id)).unwrap();
        validate_unique::<Permission>(conn, &[("name", Value::from("view_reports"))], None)
            .unwrap();
    }

    #[test]
    fn unique_check_rejects_foreign_columns() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        let err =
            validate_unique::<Role>(conn, &[("name; DROP TABLE roles", Value::from("x"))], None)
                .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { .. }));
        assert!(db.table_exists("roles").unwrap());
    }

    #[test]
    fn ensure_exists_maps_to_not_found() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        assert!(matches!(
            ensure_exists::<Role>(conn, 9),
            Err(DatabaseError::NotFound { entity_type: "role", .. })
        ));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rejected_checks_are_logged() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        insert(conn, &Permission::new("manage_schedule")).unwrap();

        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(validate_fk_exists::<Role>(conn, 42).is_err());
            assert!(ensure_exists::<Role>(conn, 43).is_err());
            assert!(validate_unique::<Permission>(
                conn,
                &[("name", Value::from("manage_schedule"))],
                None
            )
            .is_err());
        });

        let log = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("DEBUG") && log.contains("Referenced row missing"));
        assert!(log.contains("id=42"));
        assert!(log.contains("Target row missing"));
        assert!(log.contains("WARN") && log.contains("Duplicate combination rejected"));
        assert!(log.contains("entity=") && log.contains("permission"));
    }
}
