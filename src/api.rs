//! Router assembly, OpenAPI documentation and the error-to-response mapping.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use refer_core::ReferError;

use crate::routes;
use crate::state::AppState;

/// A core error carried to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(ReferError);

impl From<ReferError> for ApiError {
    fn from(err: ReferError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ReferError::Validation(_)
            | ReferError::MissingMeasurement { .. }
            | ReferError::InvalidDate
            | ReferError::IllegalTransition(_) => StatusCode::BAD_REQUEST,
            ReferError::Unauthorized => StatusCode::UNAUTHORIZED,
            ReferError::Forbidden(_) => StatusCode::FORBIDDEN,
            ReferError::NotFound(_) => StatusCode::NOT_FOUND,
            ReferError::Conflict(_) => StatusCode::CONFLICT,
            ReferError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let detail = match status {
            // Never leak internals in a 500 body.
            StatusCode::INTERNAL_SERVER_ERROR => "internal error".to_string(),
            _ => self.0.to_string(),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthRes {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthRes))
)]
/// Liveness check, unauthenticated.
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        status: "ok".into(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        routes::auth::login,
        routes::auth::me,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::patients::list_patients,
        routes::patients::search_patient,
        routes::patients::create_patient,
        routes::patients::update_patient,
        routes::patients::delete_patient,
        routes::patients::import_patients,
        routes::appointments::list_appointments,
        routes::appointments::create_appointment,
        routes::appointments::batch_appointments,
        routes::appointments::record_visit,
        routes::appointments::refer_back,
        routes::appointments::edit_appointment,
        routes::appointments::delete_appointment,
        routes::appointments::export_appointments,
        routes::home_opd::list_home_opd,
        routes::home_opd::create_home_opd,
    ),
    components(schemas(
        HealthRes,
        routes::auth::LoginReq,
        routes::auth::LoginRes,
        routes::auth::MeRes,
        routes::users::UserOut,
        routes::users::UserCreateReq,
        routes::users::UserUpdateReq,
        routes::patients::PatientOut,
        routes::patients::PatientReq,
        routes::patients::ImportSummaryRes,
        routes::appointments::AppointmentOut,
        routes::appointments::AppointmentRowOut,
        routes::appointments::ScheduleReq,
        routes::appointments::VisitReq,
        routes::appointments::ReferBackReq,
        routes::appointments::EditReq,
        routes::appointments::BatchRes,
        routes::appointments::ExportRowOut,
        routes::home_opd::HomeOpdOut,
        routes::home_opd::HomeOpdReq,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// CORS policy from the configured origins; an empty list means permissive.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application router.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(routes::auth::login))
        .route("/me", get(routes::auth::me))
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/users/:id",
            put(routes::users::update_user).delete(routes::users::delete_user),
        )
        .route(
            "/patients",
            get(routes::patients::list_patients).post(routes::patients::create_patient),
        )
        .route("/patients/search", get(routes::patients::search_patient))
        .route("/patients/import", post(routes::patients::import_patients))
        .route(
            "/patients/:id",
            put(routes::patients::update_patient).delete(routes::patients::delete_patient),
        )
        .route(
            "/appointments",
            get(routes::appointments::list_appointments)
                .post(routes::appointments::create_appointment),
        )
        .route(
            "/appointments/batch",
            post(routes::appointments::batch_appointments),
        )
        .route(
            "/appointments/export",
            get(routes::appointments::export_appointments),
        )
        .route(
            "/appointments/:id",
            put(routes::appointments::edit_appointment)
                .delete(routes::appointments::delete_appointment),
        )
        .route(
            "/appointments/:id/visit",
            put(routes::appointments::record_visit),
        )
        .route(
            "/appointments/:id/refer-back",
            put(routes::appointments::refer_back),
        )
        .route(
            "/home-opd",
            get(routes::home_opd::list_home_opd).post(routes::home_opd::create_home_opd),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
