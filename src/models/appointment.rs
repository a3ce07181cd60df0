use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Option<i64>,
    pub patient_id: i64,
    pub employee_id: i64,
    pub room_id: Option<i64>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    /// A scheduled visit without a room or notes.
    pub fn new(patient_id: i64, employee_id: i64, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            id: None,
            patient_id,
            employee_id,
            room_id: None,
            date,
            time,
            status: AppointmentStatus::Scheduled,
            notes: None,
        }
    }
}
