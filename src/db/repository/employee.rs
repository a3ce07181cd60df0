use rusqlite::{Connection, Row};

use super::{list, validate_fk_exists, validate_unique, Entity};
use crate::db::DatabaseError;
use crate::models::{Employee, Role};
use crate::query::{FilterDescriptor, SortDescriptor, Value};
use crate::validation;

impl Entity for Employee {
    const NAME: &'static str = "employee";
    const TABLE: &'static str = "employees";
    const COLUMNS: &'static [&'static str] =
        &["id", "first_name", "last_name", "role_id", "phone", "email"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            role_id: row.get("role_id")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("first_name", Value::from(&self.first_name)),
            ("last_name", Value::from(&self.last_name)),
            ("role_id", Value::from(self.role_id)),
            ("phone", Value::from(self.phone.clone())),
            ("email", Value::from(&self.email)),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::person_name("first_name", &self.first_name)?;
        validation::person_name("last_name", &self.last_name)?;
        validation::positive_id("role_id", self.role_id)?;
        if let Some(phone) = &self.phone {
            validation::phone("phone", phone)?;
        }
        validation::email("email", &self.email)
    }

    fn validate_references(
        &self,
        conn: &Connection,
        exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        validate_fk_exists::<Role>(conn, self.role_id)?;
        validate_unique::<Self>(conn, &[("email", Value::from(&self.email))], exclude_id)
    }
}

pub fn list_employees_with_role(
    conn: &Connection,
    role_id: i64,
) -> Result<Vec<Employee>, DatabaseError> {
    let filters = [FilterDescriptor::eq("role_id", role_id)];
    let sort = [SortDescriptor::asc("last_name"), SortDescriptor::asc("first_name")];
    list(conn, Some(&filters[..]), Some(&sort[..]))
}
