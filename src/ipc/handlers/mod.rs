pub mod assignments;
pub mod attendance;
pub mod communication;
pub mod core;
pub mod facilities;
pub mod reports;
pub mod session;
pub mod staff;
pub mod students;
pub mod teachers;
