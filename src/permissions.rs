//! Role and class-scope rules derived from the signed-in user.

use serde::{Serialize, Serializer};

use crate::models::{Profile, PublicUser, ReportCategory, Role, User};

/// Signed-in user plus the profile their permissions are read from.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub profile: Profile,
    pub profile_revision: u64,
    pub permissions: PermissionSummary,
}

impl Session {
    pub fn new(user: User, profile: Profile, profile_revision: u64) -> Self {
        let permissions = PermissionSummary::derive(&user, &profile);
        Self {
            user,
            profile,
            profile_revision,
            permissions,
        }
    }

    pub fn set_profile(&mut self, profile: Profile, revision: u64) {
        self.permissions = PermissionSummary::derive(&self.user, &profile);
        self.profile = profile;
        self.profile_revision = revision;
    }

    pub fn public_user(&self) -> PublicUser {
        PublicUser::from(&self.user)
    }
}

/// Classes a user may see or act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassScope {
    All,
    Classes(Vec<String>),
}

impl ClassScope {
    pub fn admits(&self, class: &str) -> bool {
        match self {
            Self::All => true,
            Self::Classes(list) => list.iter().any(|c| c == class),
        }
    }
}

impl Serialize for ClassScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Classes(list) => list.serialize(serializer),
        }
    }
}

/// What happens to a student mutation from this user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentWrite {
    Direct,
    /// Recorded as a pending operation for an administrator to review.
    Queued,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSummary {
    pub role: Role,
    pub is_admin: bool,
    pub is_teacher: bool,
    pub is_class_teacher: bool,
    pub is_department_head: bool,
    pub can_manage_students: bool,
    pub student_write: StudentWrite,
    pub class_scope: ClassScope,
    pub page_description: String,
}

impl PermissionSummary {
    pub fn derive(user: &User, profile: &Profile) -> Self {
        let is_admin = user.role == Role::Admin;
        let is_teacher = user.role == Role::Teacher;
        let is_class_teacher = is_teacher && profile.is_class_teacher;
        let is_department_head =
            matches!(user.role, Role::Teacher | Role::NonTeaching) && profile.is_department_head;
        let classes = profile.classes_taught.join(", ");

        let page_description = if !is_teacher {
            "Manage student information and track fees".to_string()
        } else if is_class_teacher {
            format!("Manage students from your classes: {classes} (requires admin approval)")
        } else {
            format!("View students from your classes: {classes} (read-only)")
        };

        let student_write = if is_admin {
            StudentWrite::Direct
        } else if is_class_teacher {
            StudentWrite::Queued
        } else {
            StudentWrite::Denied
        };

        let class_scope = if is_teacher {
            ClassScope::Classes(profile.classes_taught.clone())
        } else {
            ClassScope::All
        };

        Self {
            role: user.role,
            is_admin,
            is_teacher,
            is_class_teacher,
            is_department_head,
            can_manage_students: is_admin || is_class_teacher,
            student_write,
            class_scope,
            page_description,
        }
    }

    /// Student mutation rights for a record in `class`.
    pub fn student_write_for(&self, class: &str) -> StudentWrite {
        match self.student_write {
            StudentWrite::Queued if !self.class_scope.admits(class) => StudentWrite::Denied,
            other => other,
        }
    }

    /// Teachers, staff, facilities, users and pending-operation review.
    pub fn can_administer(&self) -> bool {
        self.is_admin
    }

    pub fn can_mark_attendance(&self, class: &str) -> bool {
        self.is_admin || (self.is_teacher && self.class_scope.admits(class))
    }

    pub fn can_edit_assignments(&self) -> bool {
        self.is_admin || self.is_teacher
    }

    pub fn can_set_assignment_status(&self) -> bool {
        self.can_edit_assignments() || self.role == Role::Pupil
    }

    pub fn can_communicate(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Teacher | Role::NonTeaching)
    }

    /// Administrators see every report book; class teachers and department
    /// heads see their own.
    pub fn can_manage_reports(&self, category: ReportCategory) -> bool {
        match category {
            ReportCategory::ReportCard => self.is_admin,
            ReportCategory::ClassReport => self.is_admin || self.is_class_teacher,
            ReportCategory::DepartmentalReport => self.is_admin || self.is_department_head,
        }
    }

    pub fn report_categories(&self) -> Vec<ReportCategory> {
        ReportCategory::ALL
            .into_iter()
            .filter(|c| self.can_manage_reports(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entity;
    use serde_json::json;

    fn user(id: &str) -> User {
        User::defaults()
            .into_iter()
            .find(|u| u.id == id)
            .expect("seeded user")
    }

    fn profile(raw: serde_json::Value) -> Profile {
        serde_json::from_value(raw).expect("profile")
    }

    #[test]
    fn string_true_grants_class_teacher_rights() {
        let as_string = PermissionSummary::derive(
            &user("3"),
            &profile(json!({ "isClassTeacher": "true", "classesTaught": "[\"P.5A\"]" })),
        );
        let as_bool = PermissionSummary::derive(
            &user("3"),
            &profile(json!({ "isClassTeacher": true, "classesTaught": ["P.5A"] })),
        );
        assert_eq!(as_string, as_bool);
        assert!(as_string.is_class_teacher);
        assert_eq!(as_string.student_write, StudentWrite::Queued);
        assert_eq!(
            as_string.page_description,
            "Manage students from your classes: P.5A (requires admin approval)"
        );
    }

    #[test]
    fn plain_teacher_is_read_only() {
        let p = PermissionSummary::derive(
            &user("4"),
            &profile(json!({ "classesTaught": ["P.6A", "P.7B"] })),
        );
        assert!(!p.can_manage_students);
        assert_eq!(p.student_write_for("P.6A"), StudentWrite::Denied);
        assert_eq!(
            p.page_description,
            "View students from your classes: P.6A, P.7B (read-only)"
        );
        assert!(p.can_mark_attendance("P.6A"));
        assert!(!p.can_mark_attendance("P.5A"));
    }

    #[test]
    fn class_teacher_cannot_queue_outside_scope() {
        let p = PermissionSummary::derive(
            &user("3"),
            &profile(json!({ "isClassTeacher": true, "classesTaught": ["P.5A"] })),
        );
        assert_eq!(p.student_write_for("P.5A"), StudentWrite::Queued);
        assert_eq!(p.student_write_for("P.7A"), StudentWrite::Denied);
    }

    #[test]
    fn class_teacher_flag_is_ignored_for_non_teachers() {
        let p = PermissionSummary::derive(&user("5"), &profile(json!({ "isClassTeacher": true })));
        assert!(!p.is_class_teacher);
        assert_eq!(p.page_description, "Manage student information and track fees");
        assert!(p.can_communicate());
        assert!(!p.can_edit_assignments());
    }

    #[test]
    fn admin_scope_serializes_as_all() {
        let p = PermissionSummary::derive(&user("9"), &Profile::default());
        assert_eq!(p.student_write_for("anything"), StudentWrite::Direct);
        let v = serde_json::to_value(&p).expect("json");
        assert_eq!(v["classScope"], json!("all"));
        assert_eq!(v["studentWrite"], json!("direct"));
    }

    #[test]
    fn department_head_flag_opens_departmental_reports_for_staff_only() {
        let head = profile(json!({ "isDepartmentHead": "true" }));
        let staff = PermissionSummary::derive(&user("5"), &head);
        assert!(staff.is_department_head);
        assert_eq!(staff.report_categories(), vec![ReportCategory::DepartmentalReport]);

        let pupil = PermissionSummary::derive(&user("1"), &head);
        assert!(!pupil.is_department_head);
        assert!(pupil.report_categories().is_empty());

        let jane = PermissionSummary::derive(
            &user("3"),
            &profile(json!({ "isClassTeacher": true, "isDepartmentHead": true })),
        );
        assert_eq!(
            jane.report_categories(),
            vec![ReportCategory::ClassReport, ReportCategory::DepartmentalReport]
        );
        let admin = PermissionSummary::derive(&user("9"), &Profile::default());
        assert_eq!(admin.report_categories().len(), 3);
    }

    #[test]
    fn pupils_may_only_move_assignment_status() {
        let p = PermissionSummary::derive(&user("1"), &Profile::default());
        assert!(p.can_set_assignment_status());
        assert!(!p.can_edit_assignments());
        assert!(!p.can_communicate());
    }
}
