//! REST route handlers, grouped per resource.

pub mod appointments;
pub mod auth;
pub mod home_opd;
pub mod patients;
pub mod users;
