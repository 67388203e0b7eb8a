//! Application state shared across REST handlers.

use std::sync::Arc;

use refer_core::account::UserAdmin;
use refer_core::appointment::AppointmentService;
use refer_core::config::AppConfig;
use refer_core::home_opd::HomeOpdService;
use refer_core::patient::PatientService;
use refer_core::store::Gateway;

use crate::auth::TokenService;

/// Services needed by the REST API endpoints, all cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub patients: PatientService,
    pub appointments: AppointmentService,
    pub users: UserAdmin,
    pub home_opd: HomeOpdService,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, config: &AppConfig) -> Self {
        Self {
            patients: PatientService::new(gateway.clone()),
            appointments: AppointmentService::new(gateway.clone()),
            users: UserAdmin::new(gateway.clone()),
            home_opd: HomeOpdService::new(gateway),
            tokens: TokenService::new(&config.token_secret, config.token_ttl_minutes),
        }
    }
}
