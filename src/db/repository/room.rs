use rusqlite::{Connection, Row};

use super::{validate_unique, Entity};
use crate::db::DatabaseError;
use crate::models::Room;
use crate::query::Value;
use crate::validation;

impl Entity for Room {
    const NAME: &'static str = "room";
    const TABLE: &'static str = "rooms";
    const COLUMNS: &'static [&'static str] = &["id", "number", "floor", "capacity"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            number: row.get("number")?,
            floor: row.get("floor")?,
            capacity: row.get("capacity")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("number", Value::from(&self.number)),
            ("floor", Value::from(self.floor)),
            ("capacity", Value::from(self.capacity)),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::room_number("number", &self.number)?;
        validation::in_range("floor", self.floor, 0..=50)?;
        validation::in_range("capacity", self.capacity, 1..=100)
    }

    fn validate_references(
        &self,
        conn: &Connection,
        exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        validate_unique::<Self>(conn, &[("number", Value::from(&self.number))], exclude_id)
    }
}
