use chrono::{NaiveDate, NaiveTime, Timelike};
use rusqlite::{Connection, Row};

use super::{validate_fk_exists, validate_optional_fk_exists, validate_unique, Entity};
use crate::db::{DatabaseError, StorageContext};
use crate::models::{Appointment, AppointmentStatus, Employee, Patient, Record, Room};
use crate::query::{
    build_filters, validate_filters_and_sorting, FilterDescriptor, SortDescriptor, Value,
};
use crate::validation;

/// First and last bookable slot of the day.
pub const OPENING_TIME: (u32, u32) = (7, 0);
pub const CLOSING_TIME: (u32, u32) = (20, 0);
/// Slots start on quarter hours.
pub const SLOT_MINUTES: u32 = 15;

fn check_slot_time(time: NaiveTime) -> Result<(), DatabaseError> {
    let minutes = time.hour() * 60 + time.minute();
    let open = OPENING_TIME.0 * 60 + OPENING_TIME.1;
    let close = CLOSING_TIME.0 * 60 + CLOSING_TIME.1;
    if minutes < open || minutes > close {
        return Err(DatabaseError::validation(
            "time",
            format!("{} is outside clinic hours", time.format("%H:%M")),
        ));
    }
    if time.second() != 0 || time.nanosecond() != 0 || minutes % SLOT_MINUTES != 0 {
        return Err(DatabaseError::validation(
            "time",
            format!("must fall on a {SLOT_MINUTES}-minute boundary"),
        ));
    }
    Ok(())
}

fn check_date(date: NaiveDate) -> Result<(), DatabaseError> {
    let earliest = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);
    let latest = NaiveDate::from_ymd_opt(2100, 12, 31).unwrap_or(NaiveDate::MAX);
    validation::date_between("date", date, earliest, latest)
}

impl Entity for Appointment {
    const NAME: &'static str = "appointment";
    const TABLE: &'static str = "appointments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "patient_id",
        "employee_id",
        "room_id",
        "date",
        "time",
        "status",
        "notes",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            employee_id: row.get("employee_id")?,
            room_id: row.get("room_id")?,
            date: row.get("date")?,
            time: row.get("time")?,
            status: row.get("status")?,
            notes: row.get("notes")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("patient_id", Value::from(self.patient_id)),
            ("employee_id", Value::from(self.employee_id)),
            ("room_id", Value::from(self.room_id)),
            ("date", Value::from(self.date)),
            ("time", Value::from(self.time)),
            ("status", Value::from(self.status)),
            ("notes", Value::from(self.notes.clone())),
        ]
    }

    fn validate_fields(&self) -> Result<(), DatabaseError> {
        validation::positive_id("patient_id", self.patient_id)?;
        validation::positive_id("employee_id", self.employee_id)?;
        if let Some(room_id) = self.room_id {
            validation::positive_id("room_id", room_id)?;
        }
        check_date(self.date)?;
        check_slot_time(self.time)?;
        validation::optional("notes", self.notes.as_deref(), 500)
    }

    /// Only scheduled visits hold a slot, matching the partial unique
    /// indexes on the table.
    fn validate_references(
        &self,
        conn: &Connection,
        exclude_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        validate_fk_exists::<Patient>(conn, self.patient_id)?;
        validate_fk_exists::<Employee>(conn, self.employee_id)?;
        validate_optional_fk_exists::<Room>(conn, self.room_id)?;

        if self.status != AppointmentStatus::Scheduled {
            return Ok(());
        }
        let slot = |holder: (&'static str, Value)| {
            [
                holder,
                ("date", Value::from(self.date)),
                ("time", Value::from(self.time)),
                ("status", Value::from(AppointmentStatus::Scheduled)),
            ]
        };
        validate_unique::<Self>(conn, &slot(("employee_id", Value::from(self.employee_id))), exclude_id)?;
        if let Some(room_id) = self.room_id {
            validate_unique::<Self>(conn, &slot(("room_id", Value::from(room_id))), exclude_id)?;
        }
        Ok(())
    }
}

/// Columns of the joined appointment view, usable in filters and sorting.
pub const APPOINTMENT_DETAIL_COLUMNS: &[&str] = &[
    "a.id",
    "a.date",
    "a.time",
    "a.status",
    "a.patient_id",
    "a.employee_id",
    "a.room_id",
    "p.last_name",
    "e.last_name",
    "r.number",
];

const APPOINTMENT_DETAIL_SELECT: &str = "SELECT a.id AS id, a.date AS date, a.time AS time,
        a.status AS status, a.notes AS notes,
        a.patient_id AS patient_id, p.first_name || ' ' || p.last_name AS patient_name,
        a.employee_id AS employee_id, e.first_name || ' ' || e.last_name AS employee_name,
        a.room_id AS room_id, r.number AS room_number
    FROM appointments a
    JOIN patients p ON p.id = a.patient_id
    JOIN employees e ON e.id = a.employee_id
    LEFT JOIN rooms r ON r.id = a.room_id";

fn record_from_row(row: &Row<'_>, names: &[String]) -> rusqlite::Result<Record> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Ok((name.clone(), row.get::<_, Value>(i)?)))
        .collect()
}

/// Appointments joined with patient, employee and room labels.
///
/// Filter and sort columns use the qualified names in
/// [`APPOINTMENT_DETAIL_COLUMNS`]; records are keyed by the unqualified
/// output names.
pub fn list_appointments_detailed(
    conn: &Connection,
    filters: Option<&[FilterDescriptor]>,
    sort_by: Option<&[SortDescriptor]>,
) -> Result<Vec<Record>, DatabaseError> {
    let query = validate_filters_and_sorting(filters, sort_by, APPOINTMENT_DETAIL_COLUMNS)?;
    let built = build_filters(&query);
    let sql = format!("{APPOINTMENT_DETAIL_SELECT} WHERE {}", built.clause);

    let mut stmt = conn.prepare(&sql).storage(Appointment::TABLE, "select")?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(built.bind(), |row| record_from_row(row, &names))
        .storage(Appointment::TABLE, "select")?;
    rows.map(|r| r.storage(Appointment::TABLE, "select")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count, insert, update, Database};
    use crate::models::Role;

    struct Fixture {
        db: Database,
        patient: i64,
        doctor: i64,
        room: i64,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        let role = insert(conn, &Role::new("Doctor")).unwrap();
        let patient = insert(
            conn,
            &Patient::new("Anna", "Nowak", NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()),
        )
        .unwrap();
        let doctor =
            insert(conn, &Employee::new("Jan", "Lis", role, "jan.lis@clinic.example.com")).unwrap();
        let room = insert(conn, &Room::new("12", 1, 2)).unwrap();
        Fixture { db, patient, doctor, room }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, 6).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn slot_time_rules() {
        assert!(check_slot_time(at(7, 0)).is_ok());
        assert!(check_slot_time(at(20, 0)).is_ok());
        assert!(check_slot_time(at(6, 45)).is_err());
        assert!(check_slot_time(at(20, 15)).is_err());
        assert!(check_slot_time(at(9, 10)).is_err());
        assert!(check_slot_time(NaiveTime::from_hms_opt(9, 0, 30).unwrap()).is_err());
    }

    #[test]
    fn stored_appointment_reads_back() {
        let f = fixture();
        let conn = f.db.conn().unwrap();
        let mut appt = Appointment::new(f.patient, f.doctor, day(), at(9, 30));
        appt.room_id = Some(f.room);
        let id = insert(conn, &appt).unwrap();

        let loaded: Appointment = crate::db::get(conn, id).unwrap();
        assert_eq!(loaded.time, at(9, 30));
        assert_eq!(loaded.status, AppointmentStatus::Scheduled);
        assert_eq!(loaded.room_id, Some(f.room));
    }

    #[test]
    fn missing_references_are_named() {
        let f = fixture();
        let conn = f.db.conn().unwrap();
        let err = insert(conn, &Appointment::new(f.patient + 9, f.doctor, day(), at(9, 0)))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ReferencedEntityNotFound { entity: "patient", .. }));

        let mut appt = Appointment::new(f.patient, f.doctor, day(), at(9, 0));
        appt.room_id = Some(f.room + 9);
        assert!(matches!(
            insert(conn, &appt),
            Err(DatabaseError::ReferencedEntityNotFound { entity: "room", .. })
        ));
    }

    #[test]
    fn double_booking_is_rejected() {
        let f = fixture();
        let conn = f.db.conn().unwrap();
        let mut first = Appointment::new(f.patient, f.doctor, day(), at(10, 0));
        first.room_id = Some(f.room);
        let id = insert(conn, &first).unwrap();

        assert!(matches!(
            insert(conn, &Appointment::new(f.patient, f.doctor, day(), at(10, 0))),
            Err(DatabaseError::DuplicateCombination { .. })
        ));

        // same room, other doctor
        let role: i64 = conn.query_row("SELECT id FROM roles", [], |r| r.get(0)).unwrap();
        let other =
            insert(conn, &Employee::new("Ewa", "Bąk", role, "ewa@clinic.example.com")).unwrap();
        let mut clash = Appointment::new(f.patient, other, day(), at(10, 0));
        clash.room_id = Some(f.room);
        assert!(matches!(
            insert(conn, &clash),
            Err(DatabaseError::DuplicateCombination { .. })
        ));

        // rewriting the booked row keeps its own slot
        first.notes = Some("Bring previous results".into());
        update(conn, id, &first).unwrap();
        assert_eq!(count::<Appointment>(conn, None).unwrap(), 1);
    }

    #[test]
    fn detailed_listing_joins_names() {
        let f = fixture();
        let conn = f.db.conn().unwrap();
        insert(conn, &Appointment::new(f.patient, f.doctor, day(), at(11, 0))).unwrap();
        let mut roomed = Appointment::new(f.patient, f.doctor, day(), at(8, 0));
        roomed.room_id = Some(f.room);
        insert(conn, &roomed).unwrap();

        let sort = [SortDescriptor::asc("a.time")];
        let rows = list_appointments_detailed(conn, None, Some(&sort[..])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["time"], Value::from("08:00"));
        assert_eq!(rows[0]["patient_name"], Value::from("Anna Nowak"));
        assert_eq!(rows[0]["room_number"], Value::from("12"));
        assert_eq!(rows[1]["room_number"], Value::Null);

        let filters = [FilterDescriptor::new("r.number", "IS NOT NULL", Value::Null)];
        assert_eq!(list_appointments_detailed(conn, Some(&filters[..]), None).unwrap().len(), 1);

        let bad = [FilterDescriptor::eq("p.email", "x")];
        assert!(list_appointments_detailed(conn, Some(&bad[..]), None).is_err());
    }

    #[test]
    fn closed_appointment_frees_its_slot() {
        let f = fixture();
        let conn = f.db.conn().unwrap();
        let mut first = Appointment::new(f.patient, f.doctor, day(), at(9, 0));
        first.room_id = Some(f.room);
        let id = insert(conn, &first).unwrap();

        first.status = AppointmentStatus::Cancelled;
        update(conn, id, &first).unwrap();

        let mut again = Appointment::new(f.patient, f.doctor, day(), at(9, 0));
        again.room_id = Some(f.room);
        insert(conn, &again).unwrap();
        assert_eq!(count::<Appointment>(conn, None).unwrap(), 2);

        // the storage backstop agrees with the pre-check
        let clash = conn.execute(
            "INSERT INTO appointments (patient_id, employee_id, date, time) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![f.patient, f.doctor, "2030-05-06", "09:00"],
        );
        assert!(clash.is_err());
    }
}
