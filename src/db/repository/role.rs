use rusqlite::{Connection, OptionalExtension, Row};

use super::{ensure_exists, validate_fk_exists, validate_unique, Entity};
use crate::db::{DatabaseError, StorageContext};
use crate::models::{Permission, Role, RolePermission};
use crate::query::Value;
use crate::validation;

impl Entity for Role {
    const NAME: &'static str = "role";
    const TABLE: &'static str = "roles";
    const COLUMNS: &'static [&'static str] = &["id", "name", "description"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(&self.name)),
            ("description", Value::from(self.description.clone())),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::label("name", &self.name, 50)?;
        validation::optional("description", self.description.as_deref(), 255)
    }

    fn validate_references(
        &self,
        conn: &Connection,
        exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        validate_unique::<Self>(conn, &[("name", Value::from(&self.name))], exclude_id)
    }

    /// Employees hold a RESTRICT key on their role.
    fn validate_delete(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
        let assigned: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM employees WHERE role_id = ?1",
                rusqlite::params![id],
                |row| row.get(0),
            )
            .storage("employees", "count")?;
        if assigned > 0 {
            return Err(DatabaseError::ConstraintViolation {
                table: Self::TABLE,
                detail: format!("role {id} is still assigned to {assigned} employee(s)"),
            });
        }
        Ok(())
    }
}

impl Entity for Permission {
    const NAME: &'static str = "permission";
    const TABLE: &'static str = "permissions";
    const COLUMNS: &'static [&'static str] = &["id", "name", "description"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(&self.name)),
            ("description", Value::from(self.description.clone())),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::identifier("name", &self.name, 50)?;
        validation::optional("description", self.description.as_deref(), 255)
    }

    fn validate_references(
        &self,
        conn: &Connection,
        exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        validate_unique::<Self>(conn, &[("name", Value::from(&self.name))], exclude_id)
    }
}

impl Entity for RolePermission {
    const NAME: &'static str = "role permission";
    const TABLE: &'static str = "role_permissions";
    const COLUMNS: &'static [&'static str] = &["id", "role_id", "permission_id"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            role_id: row.get("role_id")?,
            permission_id: row.get("permission_id")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("role_id", Value::from(self.role_id)),
            ("permission_id", Value::from(self.permission_id)),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::positive_id("role_id", self.role_id)?;
        validation::positive_id("permission_id", self.permission_id)
    }

    fn validate_references(
        &self,
        conn: &Connection,
        exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        validate_fk_exists::<Role>(conn, self.role_id)?;
        validate_fk_exists::<Permission>(conn, self.permission_id)?;
        validate_unique::<Self>(
            conn,
            &[
                ("role_id", Value::from(self.role_id)),
                ("permission_id", Value::from(self.permission_id)),
            ],
            exclude_id,
        )
    }
}

impl RolePermission {
    pub fn new(role_id: i64, permission_id: i64) -> Self {
        Self {
            id: None,
            role_id,
            permission_id,
        }
    }
}

pub fn find_role_by_name(conn: &Connection, name: &str) -> Result<Option<Role>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, description FROM roles WHERE name = ?1",
        rusqlite::params![name],
        Role::from_row,
    )
    .optional()
    .storage(Role::TABLE, "select")
}

pub fn find_permission_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<Permission>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, description FROM permissions WHERE name = ?1",
        rusqlite::params![name],
        Permission::from_row,
    )
    .optional()
    .storage(Permission::TABLE, "select")
}

/// Link row for the pair, if granted.
pub fn find_role_permission(
    conn: &Connection,
    role_id: i64,
    permission_id: i64,
) -> Result<Option<RolePermission>, DatabaseError> {
    conn.query_row(
        "SELECT id, role_id, permission_id FROM role_permissions
         WHERE role_id = ?1 AND permission_id = ?2",
        rusqlite::params![role_id, permission_id],
        RolePermission::from_row,
    )
    .optional()
    .storage(RolePermission::TABLE, "select")
}

/// Permissions granted to `role_id`, by name. `NotFound` for an unknown role.
pub fn list_permissions_for_role(
    conn: &Connection,
    role_id: i64,
) -> Result<Vec<Permission>, DatabaseError> {
    ensure_exists::<Role>(conn, role_id)?;
    let mut stmt = conn
        .prepare(
            "SELECT p.id, p.name, p.description
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = ?1
             ORDER BY p.name",
        )
        .storage(Permission::TABLE, "select")?;
    let rows = stmt
        .query_map(rusqlite::params![role_id], Permission::from_row)
        .storage(Permission::TABLE, "select")?;
    rows.map(|r| r.storage(Permission::TABLE, "select")).collect()
}
