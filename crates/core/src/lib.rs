//! # Refer Core
//!
//! Business logic for the NCD referral network: patient directory, referral
//! appointments and their triage-driven state machine, staff accounts, the home
//! OPD log, and the bulk import/export contracts.
//!
//! Everything here is scoped by the acting [`session::Identity`]; zone enforcement
//! happens in these services, not at the HTTP layer. Storage goes through the
//! [`store::Gateway`] trait.
//!
//! **No API concerns**: authentication tokens, HTTP routing and wire DTOs belong
//! to the server binary.

pub mod account;
pub mod appointment;
pub mod batch;
pub mod calendar;
pub mod config;
pub mod error;
pub mod export;
pub mod home_opd;
pub mod import;
pub mod patient;
pub mod session;
pub mod store;
pub mod triage;
pub mod zone;

pub use error::{ReferError, ReferResult};
