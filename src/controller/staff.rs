use crate::db::{self, Database, Repository};
use crate::models::{Employee, Room};
use crate::query::{FilterDescriptor, SortDescriptor};

use super::ClinicError;

pub struct EmployeeController<'db> {
    db: &'db Database,
    employees: Repository<'db, Employee>,
}

impl<'db> EmployeeController<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            employees: Repository::new(db),
        }
    }

    pub fn hire(&self, employee: &Employee) -> Result<Employee, ClinicError> {
        let id = self.employees.insert(employee)?;
        Ok(self.employees.get(id)?)
    }

    pub fn get(&self, id: i64) -> Result<Employee, ClinicError> {
        Ok(self.employees.get(id)?)
    }

    pub fn update(&self, id: i64, employee: &Employee) -> Result<Employee, ClinicError> {
        self.employees.update(id, employee)?;
        Ok(self.employees.get(id)?)
    }

    /// Their appointments are removed with them.
    pub fn dismiss(&self, id: i64) -> Result<(), ClinicError> {
        Ok(self.employees.delete(id)?)
    }

    pub fn list(
        &self,
        filters: &[FilterDescriptor],
        sort_by: &[SortDescriptor],
    ) -> Result<Vec<Employee>, ClinicError> {
        Ok(self.employees.list(Some(filters), Some(sort_by))?)
    }

    pub fn with_role(&self, role_id: i64) -> Result<Vec<Employee>, ClinicError> {
        Ok(db::list_employees_with_role(self.db.conn()?, role_id)?)
    }
}

pub struct RoomController<'db> {
    rooms: Repository<'db, Room>,
}

impl<'db> RoomController<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            rooms: Repository::new(db),
        }
    }

    pub fn add(&self, room: &Room) -> Result<Room, ClinicError> {
        let id = self.rooms.insert(room)?;
        Ok(self.rooms.get(id)?)
    }

    pub fn get(&self, id: i64) -> Result<Room, ClinicError> {
        Ok(self.rooms.get(id)?)
    }

    pub fn update(&self, id: i64, room: &Room) -> Result<Room, ClinicError> {
        self.rooms.update(id, room)?;
        Ok(self.rooms.get(id)?)
    }

    /// Appointments in the room keep their slot without a room.
    pub fn remove(&self, id: i64) -> Result<(), ClinicError> {
        Ok(self.rooms.delete(id)?)
    }

    pub fn list(
        &self,
        filters: &[FilterDescriptor],
        sort_by: &[SortDescriptor],
    ) -> Result<Vec<Room>, ClinicError> {
        Ok(self.rooms.list(Some(filters), Some(sort_by))?)
    }
}
