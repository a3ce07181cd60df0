use crate::db::{self, Database, Repository};
use crate::models::Patient;
use crate::query::{FilterDescriptor, Page, SortDescriptor};

use super::ClinicError;

pub struct PatientController<'db> {
    patients: Repository<'db, Patient>,
    db: &'db Database,
}

impl<'db> PatientController<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            patients: Repository::new(db),
            db,
        }
    }

    pub fn register(&self, patient: &Patient) -> Result<Patient, ClinicError> {
        let id = self.patients.insert(patient)?;
        Ok(self.patients.get(id)?)
    }

    pub fn get(&self, id: i64) -> Result<Patient, ClinicError> {
        Ok(self.patients.get(id)?)
    }

    pub fn update(&self, id: i64, patient: &Patient) -> Result<Patient, ClinicError> {
        self.patients.update(id, patient)?;
        Ok(self.patients.get(id)?)
    }

    /// Appointments of the patient go with it.
    pub fn remove(&self, id: i64) -> Result<(), ClinicError> {
        Ok(self.patients.delete(id)?)
    }

    pub fn search(
        &self,
        filters: &[FilterDescriptor],
        sort_by: &[SortDescriptor],
    ) -> Result<Vec<Patient>, ClinicError> {
        Ok(self.patients.list(Some(filters), Some(sort_by))?)
    }

    pub fn search_page(
        &self,
        filters: &[FilterDescriptor],
        sort_by: &[SortDescriptor],
        page: Page,
    ) -> Result<Vec<Patient>, ClinicError> {
        Ok(self.patients.list_page(Some(filters), Some(sort_by), page)?)
    }

    /// Search with filters and sorting in their JSON form, e.g.
    /// `[{"column": "last_name", "operator": "LIKE", "value": "Now%"}]` and
    /// `[["birth_date", "desc"]]`. `null` means none.
    pub fn search_json(
        &self,
        filters: &serde_json::Value,
        sort_by: &serde_json::Value,
    ) -> Result<Vec<Patient>, ClinicError> {
        let filters = FilterDescriptor::list_from_json(filters)?;
        let sort_by = SortDescriptor::list_from_json(sort_by)?;
        self.search(&filters, &sort_by)
    }

    pub fn count(&self, filters: &[FilterDescriptor]) -> Result<i64, ClinicError> {
        Ok(self.patients.count(Some(filters))?)
    }

    pub fn find_by_name(&self, first_name: &str, last_name: &str) -> Result<Vec<Patient>, ClinicError> {
        Ok(db::find_patients_by_name(self.db.conn()?, first_name, last_name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn seed(ctl: &PatientController<'_>) {
        for (first, last, year) in [
            ("Anna", "Nowak", 1980),
            ("Jan", "Nowicki", 1975),
            ("Ewa", "Kowalska", 2002),
        ] {
            ctl.register(&Patient::new(first, last, NaiveDate::from_ymd_opt(year, 1, 15).unwrap()))
                .unwrap();
        }
    }

    #[test]
    fn register_get_update_remove() {
        let db = Database::open_in_memory().unwrap();
        let ctl = PatientController::new(&db);
        let mut p = ctl
            .register(&Patient::new("Anna", "Nowak", NaiveDate::from_ymd_opt(1980, 2, 2).unwrap()))
            .unwrap();
        let id = p.id.unwrap();
        assert_eq!(ctl.get(id).unwrap().full_name(), "Anna Nowak");

        p.email = Some("anna@example.com".into());
        assert_eq!(ctl.update(id, &p).unwrap().email.as_deref(), Some("anna@example.com"));

        ctl.remove(id).unwrap();
        assert!(matches!(ctl.get(id), Err(ClinicError::NotFound(_))));
    }

    #[test]
    fn search_json_filters_and_sorts() {
        let db = Database::open_in_memory().unwrap();
        let ctl = PatientController::new(&db);
        seed(&ctl);

        let found = ctl
            .search_json(
                &json!([{"column": "last_name", "operator": "like", "value": "Now%"}]),
                &json!([["birth_date", "DESC"]]),
            )
            .unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.first_name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Jan"]);

        assert_eq!(ctl.search_json(&json!(null), &json!(null)).unwrap().len(), 3);
    }

    #[test]
    fn search_rejects_bad_descriptors() {
        let db = Database::open_in_memory().unwrap();
        let ctl = PatientController::new(&db);
        seed(&ctl);

        let err = ctl
            .search_json(&json!([{"column": "last_name", "operator": "="}]), &json!(null))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_QUERY");

        let err = ctl
            .search(&[FilterDescriptor::new("age", ">", 30)], &[])
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_COLUMN");

        let err = ctl
            .search(&[FilterDescriptor::new("last_name", "REGEXP", "x")], &[])
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_OPERATOR");

        let err = ctl
            .search(&[], &[SortDescriptor::new("last_name", "sideways")])
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[test]
    fn paging_and_counting() {
        let db = Database::open_in_memory().unwrap();
        let ctl = PatientController::new(&db);
        seed(&ctl);

        let sort = [SortDescriptor::asc("id")];
        let second = ctl.search_page(&[], &sort, Page::number(2, 2)).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].first_name, "Ewa");
        assert_eq!(
            ctl.count(&[FilterDescriptor::new("birth_date", "<", "1990-01-01")]).unwrap(),
            2
        );
        assert_eq!(ctl.find_by_name("Jan", "Nowicki").unwrap().len(), 1);
    }
}
