pub mod assignment;
pub mod attendance;
pub mod dashboard;
pub mod operation;
