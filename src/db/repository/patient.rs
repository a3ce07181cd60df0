use chrono::{Local, NaiveDate};
use rusqlite::{Connection, Row};

use super::{list, Entity};
use crate::db::DatabaseError;
use crate::models::Patient;
use crate::query::{FilterDescriptor, SortDescriptor, Value};
use crate::validation;

/// Earliest birth date accepted for a patient.
pub fn earliest_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Entity for Patient {
    const NAME: &'static str = "patient";
    const TABLE: &'static str = "patients";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "first_name",
        "last_name",
        "birth_date",
        "phone",
        "email",
        "address",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            birth_date: row.get("birth_date")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            address: row.get("address")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("first_name", Value::from(&self.first_name)),
            ("last_name", Value::from(&self.last_name)),
            ("birth_date", Value::from(self.birth_date)),
            ("phone", Value::from(self.phone.clone())),
            ("email", Value::from(self.email.clone())),
            ("address", Value::from(self.address.clone())),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::person_name("first_name", &self.first_name)?;
        validation::person_name("last_name", &self.last_name)?;
        validation::date_between(
            "birth_date",
            self.birth_date,
            earliest_birth_date(),
            Local::now().date_naive(),
        )?;
        if let Some(phone) = &self.phone {
            validation::phone("phone", phone)?;
        }
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        validation::optional("address", self.address.as_deref(), 200)
    }
}

/// Patients with exactly this first and last name, oldest id first.
pub fn find_patients_by_name(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
) -> Result<Vec<Patient>, DatabaseError> {
    let filters = [
        FilterDescriptor::eq("first_name", first_name),
        FilterDescriptor::eq("last_name", last_name),
    ];
    let sort = [SortDescriptor::asc("id")];
    list(conn, Some(&filters[..]), Some(&sort[..]))
}
