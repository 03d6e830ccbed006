pub mod assignment;
pub mod attendance;
pub mod communication;
pub mod facility;
pub mod pending;
pub mod report;
pub mod staff;
pub mod student;
pub mod teacher;
pub mod user;

pub use assignment::{Assignment, AssignmentStatus, Priority};
pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use communication::{Contact, Message};
pub use facility::{Facility, FacilityStatus};
pub use pending::{Notification, OperationType, PendingStudentOperation, ReviewStatus};
pub use report::{
    ClassReports, DepartmentalReports, Report, ReportBook, ReportCards, ReportCategory, ReportListing,
    ReportStatus,
};
pub use staff::{StaffMember, StaffStatus, StaffType};
pub use student::{FeeStatus, Student};
pub use teacher::{Teacher, TeacherStatus};
pub use user::{AccountStatus, Profile, PublicUser, Role, User};
