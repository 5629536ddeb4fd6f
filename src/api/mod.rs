pub mod assignment;
pub mod catalog;
pub mod dashboard;
pub mod department;
pub mod employee;
pub mod leave_request;
pub mod position;
pub mod timekeeping;
