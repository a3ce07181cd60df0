use chrono::{NaiveDate, NaiveTime};

use crate::db::{self, Database, DatabaseError, Repository};
use crate::models::{Appointment, AppointmentStatus, Record};
use crate::query::{FilterDescriptor, SortDescriptor};

use super::ClinicError;

/// Booking request addressed by patient name instead of id.
#[derive(Debug, Clone)]
pub struct NamedBooking<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub employee_id: i64,
    pub room_id: Option<i64>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<&'a str>,
}

pub struct AppointmentController<'db> {
    db: &'db Database,
    appointments: Repository<'db, Appointment>,
}

impl<'db> AppointmentController<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            appointments: Repository::new(db),
        }
    }

    /// Book a new visit. The status is always reset to scheduled.
    pub fn schedule(&self, appointment: &Appointment) -> Result<Appointment, ClinicError> {
        let booking = Appointment {
            status: AppointmentStatus::Scheduled,
            ..appointment.clone()
        };
        let id = self.appointments.insert(&booking)?;
        tracing::info!(
            id,
            patient_id = booking.patient_id,
            employee_id = booking.employee_id,
            date = %booking.date,
            "Appointment scheduled"
        );
        Ok(self.appointments.get(id)?)
    }

    /// Resolve the patient by exact name, then book. Unknown names are
    /// `NotFound`; namesakes make the request ambiguous.
    pub fn schedule_for_patient(&self, booking: &NamedBooking<'_>) -> Result<Appointment, ClinicError> {
        let matches =
            db::find_patients_by_name(self.db.conn()?, booking.first_name, booking.last_name)?;
        let patient_id = match matches.as_slice() {
            [] => {
                return Err(DatabaseError::not_found(
                    "patient",
                    format!("{} {}", booking.first_name, booking.last_name),
                )
                .into())
            }
            [only] => only.id.ok_or_else(|| DatabaseError::not_found("patient", "<unsaved>"))?,
            many => {
                return Err(DatabaseError::validation(
                    "patient",
                    format!(
                        "{} patients are named {} {}; book by id instead",
                        many.len(),
                        booking.first_name,
                        booking.last_name
                    ),
                )
                .into())
            }
        };

        self.schedule(&Appointment {
            id: None,
            patient_id,
            employee_id: booking.employee_id,
            room_id: booking.room_id,
            date: booking.date,
            time: booking.time,
            status: AppointmentStatus::Scheduled,
            notes: booking.notes.map(str::to_string),
        })
    }

    pub fn get(&self, id: i64) -> Result<Appointment, ClinicError> {
        Ok(self.appointments.get(id)?)
    }

    /// Move a scheduled visit to another slot and room.
    pub fn reschedule(
        &self,
        id: i64,
        date: NaiveDate,
        time: NaiveTime,
        room_id: Option<i64>,
    ) -> Result<Appointment, ClinicError> {
        let current = self.open_appointment(id)?;
        let moved = Appointment {
            date,
            time,
            room_id,
            ..current
        };
        self.appointments.update(id, &moved)?;
        tracing::info!(id, date = %date, "Appointment rescheduled");
        Ok(self.appointments.get(id)?)
    }

    pub fn cancel(&self, id: i64) -> Result<Appointment, ClinicError> {
        self.close(id, AppointmentStatus::Cancelled)
    }

    pub fn complete(&self, id: i64) -> Result<Appointment, ClinicError> {
        self.close(id, AppointmentStatus::Completed)
    }

    pub fn mark_no_show(&self, id: i64) -> Result<Appointment, ClinicError> {
        self.close(id, AppointmentStatus::NoShow)
    }

    pub fn remove(&self, id: i64) -> Result<(), ClinicError> {
        Ok(self.appointments.delete(id)?)
    }

    pub fn list(
        &self,
        filters: &[FilterDescriptor],
        sort_by: &[SortDescriptor],
    ) -> Result<Vec<Appointment>, ClinicError> {
        Ok(self.appointments.list(Some(filters), Some(sort_by))?)
    }

    /// Joined view; columns are the qualified names in
    /// [`APPOINTMENT_DETAIL_COLUMNS`](crate::db::APPOINTMENT_DETAIL_COLUMNS).
    pub fn list_detailed(
        &self,
        filters: &[FilterDescriptor],
        sort_by: &[SortDescriptor],
    ) -> Result<Vec<Record>, ClinicError> {
        Ok(db::list_appointments_detailed(
            self.db.conn()?,
            Some(filters),
            Some(sort_by),
        )?)
    }

    pub fn for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, ClinicError> {
        db::ensure_exists::<crate::models::Patient>(self.db.conn()?, patient_id)?;
        self.list(
            &[FilterDescriptor::eq("patient_id", patient_id)],
            &[SortDescriptor::asc("date"), SortDescriptor::asc("time")],
        )
    }

    fn open_appointment(&self, id: i64) -> Result<Appointment, ClinicError> {
        let current = self.appointments.get(id)?;
        if current.status.is_final() {
            return Err(DatabaseError::validation(
                "status",
                format!("appointment {id} is already {}", current.status),
            )
            .into());
        }
        Ok(current)
    }

    fn close(&self, id: i64, status: AppointmentStatus) -> Result<Appointment, ClinicError> {
        let current = self.open_appointment(id)?;
        self.appointments
            .update(id, &Appointment { status, ..current })?;
        tracing::info!(id, status = %status, "Appointment closed");
        Ok(self.appointments.get(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{EmployeeController, PatientController, RoleController, RoomController};
    use crate::models::{Employee, Patient, Room};
    use crate::query::Value;

    struct Clinic {
        db: Database,
        patient: i64,
        doctor: i64,
        room: i64,
    }

    fn clinic() -> Clinic {
        let db = Database::open_in_memory().unwrap();
        let role = RoleController::new(&db).add_role("Doctor", None).unwrap().id.unwrap();
        let patient = PatientController::new(&db)
            .register(&Patient::new("Anna", "Nowak", NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()))
            .unwrap()
            .id
            .unwrap();
        let doctor = EmployeeController::new(&db)
            .hire(&Employee::new("Jan", "Lis", role, "jan.lis@clinic.example.com"))
            .unwrap()
            .id
            .unwrap();
        let room = RoomController::new(&db).add(&Room::new("12", 1, 2)).unwrap().id.unwrap();
        Clinic { db, patient, doctor, room }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, d).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booking<'a>(c: &Clinic, first: &'a str, last: &'a str) -> NamedBooking<'a> {
        NamedBooking {
            first_name: first,
            last_name: last,
            employee_id: c.doctor,
            room_id: Some(c.room),
            date: day(6),
            time: at(9, 0),
            notes: None,
        }
    }

    #[test]
    fn schedule_forces_scheduled_status() {
        let c = clinic();
        let ctl = AppointmentController::new(&c.db);
        let mut appt = Appointment::new(c.patient, c.doctor, day(6), at(9, 0));
        appt.status = AppointmentStatus::Completed;
        assert_eq!(ctl.schedule(&appt).unwrap().status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn schedule_by_patient_name() {
        let c = clinic();
        let ctl = AppointmentController::new(&c.db);

        let appt = ctl.schedule_for_patient(&booking(&c, "Anna", "Nowak")).unwrap();
        assert_eq!(appt.patient_id, c.patient);

        let unknown = ctl.schedule_for_patient(&booking(&c, "Adam", "Nowak")).unwrap_err();
        assert!(matches!(unknown, ClinicError::NotFound(_)));

        PatientController::new(&c.db)
            .register(&Patient::new("Anna", "Nowak", NaiveDate::from_ymd_opt(1999, 9, 9).unwrap()))
            .unwrap();
        let mut later = booking(&c, "Anna", "Nowak");
        later.time = at(10, 0);
        let ambiguous = ctl.schedule_for_patient(&later).unwrap_err();
        assert!(matches!(ambiguous, ClinicError::Validation(_)));
    }

    #[test]
    fn cancelled_visits_cannot_move() {
        let c = clinic();
        let ctl = AppointmentController::new(&c.db);
        let id = ctl
            .schedule(&Appointment::new(c.patient, c.doctor, day(6), at(9, 0)))
            .unwrap()
            .id
            .unwrap();

        let moved = ctl.reschedule(id, day(7), at(11, 30), Some(c.room)).unwrap();
        assert_eq!((moved.date, moved.time, moved.room_id), (day(7), at(11, 30), Some(c.room)));

        assert_eq!(ctl.cancel(id).unwrap().status, AppointmentStatus::Cancelled);
        assert_eq!(ctl.cancel(id).unwrap_err().code(), "INVALID_FIELD");
        assert!(ctl.reschedule(id, day(8), at(9, 0), None).is_err());
        assert!(matches!(ctl.complete(id + 50), Err(ClinicError::NotFound(_))));
    }

    #[test]
    fn reschedule_into_taken_slot_fails() {
        let c = clinic();
        let ctl = AppointmentController::new(&c.db);
        ctl.schedule(&Appointment::new(c.patient, c.doctor, day(6), at(9, 0))).unwrap();
        let second = ctl
            .schedule(&Appointment::new(c.patient, c.doctor, day(6), at(9, 15)))
            .unwrap();
        let err = ctl
            .reschedule(second.id.unwrap(), day(6), at(9, 0), None)
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE");
        assert_eq!(ctl.get(second.id.unwrap()).unwrap().time, at(9, 15));
    }

    #[test]
    fn patient_history_and_detailed_view() {
        let c = clinic();
        let ctl = AppointmentController::new(&c.db);
        let late = ctl
            .schedule(&Appointment::new(c.patient, c.doctor, day(9), at(8, 0)))
            .unwrap();
        ctl.schedule(&Appointment::new(c.patient, c.doctor, day(6), at(8, 0))).unwrap();
        ctl.mark_no_show(late.id.unwrap()).unwrap();

        let dates: Vec<NaiveDate> = ctl.for_patient(c.patient).unwrap().iter().map(|a| a.date).collect();
        assert_eq!(dates, vec![day(6), day(9)]);
        assert!(matches!(ctl.for_patient(c.patient + 1), Err(ClinicError::NotFound(_))));

        let rows = ctl
            .list_detailed(
                &[FilterDescriptor::eq("a.status", "no_show")],
                &[SortDescriptor::desc("a.date")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["employee_name"], Value::from("Jan Lis"));

        ctl.remove(late.id.unwrap()).unwrap();
        assert_eq!(ctl.list(&[], &[]).unwrap().len(), 1);
    }

    #[test]
    fn cancelled_slot_can_be_rebooked() {
        let c = clinic();
        let ctl = AppointmentController::new(&c.db);
        let mut appt = Appointment::new(c.patient, c.doctor, day(6), at(9, 0));
        appt.room_id = Some(c.room);
        let id = ctl.schedule(&appt).unwrap().id.unwrap();

        assert_eq!(ctl.schedule(&appt).unwrap_err().code(), "DUPLICATE");
        ctl.cancel(id).unwrap();
        let rebooked = ctl.schedule(&appt).unwrap();
        assert_ne!(rebooked.id, Some(id));
        assert_eq!(rebooked.status, AppointmentStatus::Scheduled);

        // a no-show frees the slot as well
        ctl.mark_no_show(rebooked.id.unwrap()).unwrap();
        ctl.schedule(&appt).unwrap();
    }
}
