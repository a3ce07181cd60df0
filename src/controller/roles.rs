use crate::db::{self, Database, DatabaseError, Repository};
use crate::models::{Permission, Role, RolePermission};
use crate::query::SortDescriptor;

use super::ClinicError;

/// Roles, permissions and the grants between them.
pub struct RoleController<'db> {
    db: &'db Database,
}

impl<'db> RoleController<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn add_role(&self, name: &str, description: Option<&str>) -> Result<Role, ClinicError> {
        let roles = Repository::<Role>::new(self.db);
        let id = roles.insert(&Role {
            id: None,
            name: name.to_string(),
            description: description.map(str::to_string),
        })?;
        Ok(roles.get(id)?)
    }

    pub fn add_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Permission, ClinicError> {
        let permissions = Repository::<Permission>::new(self.db);
        let id = permissions.insert(&Permission {
            id: None,
            name: name.to_string(),
            description: description.map(str::to_string),
        })?;
        Ok(permissions.get(id)?)
    }

    pub fn list_roles(&self) -> Result<Vec<Role>, ClinicError> {
        Ok(db::list(self.db.conn()?, None, Some(&[SortDescriptor::asc("name")][..]))?)
    }

    pub fn list_permissions(&self) -> Result<Vec<Permission>, ClinicError> {
        Ok(db::list(self.db.conn()?, None, Some(&[SortDescriptor::asc("name")][..]))?)
    }

    pub fn rename_role(&self, role_id: i64, name: &str) -> Result<Role, ClinicError> {
        let roles = Repository::<Role>::new(self.db);
        let mut role = roles.get(role_id)?;
        role.name = name.to_string();
        roles.update(role_id, &role)?;
        Ok(roles.get(role_id)?)
    }

    /// Fails while employees still hold the role.
    pub fn remove_role(&self, role_id: i64) -> Result<(), ClinicError> {
        Ok(Repository::<Role>::new(self.db).delete(role_id)?)
    }

    pub fn remove_permission(&self, permission_id: i64) -> Result<(), ClinicError> {
        Ok(Repository::<Permission>::new(self.db).delete(permission_id)?)
    }

    /// Grant `permission_id` to `role_id`. Granting twice is a validation error.
    pub fn link_permission(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<RolePermission, ClinicError> {
        let links = Repository::<RolePermission>::new(self.db);
        let id = links.insert(&RolePermission::new(role_id, permission_id))?;
        tracing::info!(role_id, permission_id, "Permission granted");
        Ok(links.get(id)?)
    }

    /// Remove a grant by its own id.
    pub fn unlink(&self, link_id: i64) -> Result<(), ClinicError> {
        Repository::<RolePermission>::new(self.db).delete(link_id)?;
        tracing::info!(link_id, "Permission revoked");
        Ok(())
    }

    /// Remove the grant of `permission_id` to `role_id`.
    pub fn unlink_permission(&self, role_id: i64, permission_id: i64) -> Result<(), ClinicError> {
        let link = db::find_role_permission(self.db.conn()?, role_id, permission_id)?
            .and_then(|l| l.id)
            .ok_or_else(|| {
                DatabaseError::not_found(
                    "role permission",
                    format!("role {role_id} / permission {permission_id}"),
                )
            })?;
        self.unlink(link)
    }

    pub fn permissions_for_role(&self, role_id: i64) -> Result<Vec<Permission>, ClinicError> {
        Ok(db::list_permissions_for_role(self.db.conn()?, role_id)?)
    }

    pub fn role_has_permission(&self, role_id: i64, permission: &str) -> Result<bool, ClinicError> {
        Ok(self
            .permissions_for_role(role_id)?
            .iter()
            .any(|p| p.name == permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_permission_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let ctl = RoleController::new(&db);

        let admin = ctl.add_role("Admin", None).unwrap();
        let perm = ctl.add_permission("manage_schedule", Some("Edit the timetable")).unwrap();
        let (role_id, perm_id) = (admin.id.unwrap(), perm.id.unwrap());

        let link = ctl.link_permission(role_id, perm_id).unwrap();
        assert!(ctl.role_has_permission(role_id, "manage_schedule").unwrap());

        let again = ctl.link_permission(role_id, perm_id).unwrap_err();
        assert!(matches!(
            again,
            ClinicError::Validation(DatabaseError::DuplicateCombination { .. })
        ));

        let missing = ctl.unlink(link.id.unwrap() + 100).unwrap_err();
        assert!(matches!(missing, ClinicError::NotFound(_)));

        ctl.unlink(link.id.unwrap()).unwrap();
        assert!(ctl.permissions_for_role(role_id).unwrap().is_empty());
        assert!(matches!(
            ctl.unlink_permission(role_id, perm_id),
            Err(ClinicError::NotFound(_))
        ));
    }

    #[test]
    fn linking_unknown_permission_is_validation() {
        let db = Database::open_in_memory().unwrap();
        let ctl = RoleController::new(&db);
        let role = ctl.add_role("Admin", None).unwrap();
        let err = ctl.link_permission(role.id.unwrap(), 5).unwrap_err();
        assert_eq!(err.code(), "REFERENCE_MISSING");
    }

    #[test]
    fn roles_list_by_name_and_rename() {
        let db = Database::open_in_memory().unwrap();
        let ctl = RoleController::new(&db);
        let nurse = ctl.add_role("Nurse", None).unwrap();
        ctl.add_role("Doctor", None).unwrap();
        let names: Vec<String> = ctl.list_roles().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Doctor", "Nurse"]);

        assert_eq!(ctl.rename_role(nurse.id.unwrap(), "Head Nurse").unwrap().name, "Head Nurse");
        assert_eq!(
            ctl.rename_role(nurse.id.unwrap(), "Doctor").unwrap_err().code(),
            "DUPLICATE"
        );
    }

    #[test]
    fn remove_permission_drops_grants() {
        let db = Database::open_in_memory().unwrap();
        let ctl = RoleController::new(&db);
        let role = ctl.add_role("Admin", None).unwrap().id.unwrap();
        let perm = ctl.add_permission("view_reports", None).unwrap().id.unwrap();
        ctl.link_permission(role, perm).unwrap();
        ctl.remove_permission(perm).unwrap();
        assert!(ctl.list_permissions().unwrap().is_empty());
        assert!(ctl.permissions_for_role(role).unwrap().is_empty());
        ctl.remove_role(role).unwrap();
        assert!(matches!(ctl.remove_role(role), Err(ClinicError::NotFound(_))));
    }
}
