//! # NCD Refer
//!
//! REST server for the NCD referral network: a hospital and its surrounding
//! community health centers tracking chronic-disease patients through scheduled
//! referral appointments.
//!
//! Business rules live in `refer-core`; this crate owns the HTTP surface, bearer
//! tokens and wire DTOs.

pub mod api;
pub mod auth;
pub mod routes;
pub mod state;

pub use api::build_router;
pub use state::AppState;
