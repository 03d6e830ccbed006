use serde::Serialize;

use crate::models::{
    Assignment, AttendanceRecord, ClassReports, Contact, DepartmentalReports, Facility, Message,
    Notification, PendingStudentOperation, Report, ReportCards, StaffMember, Student, Teacher, User,
};
use crate::storage::Storage;
use crate::store::{Collection, Entity};

/// Every entity collection the daemon serves, loaded from one backend.
pub struct Stores {
    pub students: Collection<Student>,
    pub teachers: Collection<Teacher>,
    pub staff: Collection<StaffMember>,
    pub attendance: Collection<AttendanceRecord>,
    pub assignments: Collection<Assignment>,
    pub facilities: Collection<Facility>,
    pub messages: Collection<Message>,
    pub contacts: Collection<Contact>,
    pub users: Collection<User>,
    pub pending: Collection<PendingStudentOperation>,
    pub notifications: Collection<Notification>,
    pub report_cards: Collection<Report<ReportCards>>,
    pub class_reports: Collection<Report<ClassReports>>,
    pub departmental_reports: Collection<Report<DepartmentalReports>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionHealth {
    pub key: String,
    pub records: usize,
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

fn health_of<T: Entity>(c: &Collection<T>) -> CollectionHealth {
    CollectionHealth {
        key: c.key().to_string(),
        records: c.items().len(),
        revision: c.revision(),
        degraded: c.degraded().map(|s| s.to_string()),
    }
}

impl Stores {
    pub fn load(storage: &dyn Storage) -> Self {
        Self {
            students: Collection::load(storage),
            teachers: Collection::load(storage),
            staff: Collection::load(storage),
            attendance: Collection::load(storage),
            assignments: Collection::load(storage),
            facilities: Collection::load(storage),
            messages: Collection::load(storage),
            contacts: Collection::load(storage),
            users: Collection::load(storage),
            pending: Collection::load(storage),
            notifications: Collection::load(storage),
            report_cards: Collection::load(storage),
            class_reports: Collection::load(storage),
            departmental_reports: Collection::load(storage),
        }
    }

    pub fn health(&self) -> Vec<CollectionHealth> {
        vec![
            health_of(&self.students),
            health_of(&self.teachers),
            health_of(&self.staff),
            health_of(&self.attendance),
            health_of(&self.assignments),
            health_of(&self.facilities),
            health_of(&self.messages),
            health_of(&self.contacts),
            health_of(&self.users),
            health_of(&self.pending),
            health_of(&self.notifications),
            health_of(&self.report_cards),
            health_of(&self.class_reports),
            health_of(&self.departmental_reports),
        ]
    }

    /// Keys of the collections, in the order `health` lists them.
    pub fn keys() -> [&'static str; 14] {
        [
            Student::STORAGE_KEY,
            Teacher::STORAGE_KEY,
            StaffMember::STORAGE_KEY,
            AttendanceRecord::STORAGE_KEY,
            Assignment::STORAGE_KEY,
            Facility::STORAGE_KEY,
            Message::STORAGE_KEY,
            Contact::STORAGE_KEY,
            User::STORAGE_KEY,
            PendingStudentOperation::STORAGE_KEY,
            Notification::STORAGE_KEY,
            Report::<ReportCards>::STORAGE_KEY,
            Report::<ClassReports>::STORAGE_KEY,
            Report::<DepartmentalReports>::STORAGE_KEY,
        ]
    }
}
