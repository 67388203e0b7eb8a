//! End-to-end tests against the assembled router, no network involved.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use refer_core::account::{hash_password, NewUserRecord};
use refer_core::config::{AppConfig, EnvOverrides};
use refer_core::session::Role;
use refer_core::store::{Gateway, MemoryGateway};

use ncd_refer::{build_router, AppState};

fn test_app() -> Router {
    let gateway: Arc<dyn Gateway> = Arc::new(MemoryGateway::new());

    gateway
        .insert_user(NewUserRecord {
            username: "admin".into(),
            password_hash: hash_password("admin1234"),
            role: Role::Admin,
            location_name: None,
            name: Some("Administrator".into()),
            position: None,
        })
        .expect("seed admin");
    gateway
        .insert_user(NewUserRecord {
            username: "clerk".into(),
            password_hash: hash_password("clerkpw"),
            role: Role::Hospital,
            location_name: None,
            name: None,
            position: None,
        })
        .expect("seed clerk");
    gateway
        .insert_user(NewUserRecord {
            username: "nurse1".into(),
            password_hash: hash_password("nursepw"),
            role: Role::Hc,
            location_name: Some("Ban Puan Phu HPH".into()),
            name: None,
            position: None,
        })
        .expect("seed nurse");

    let config = AppConfig::resolve(None, EnvOverrides::default()).expect("config");
    build_router(AppState::new(gateway, &config), &config.cors_origins)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/login",
            None,
            Some(json!({ "username": username, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn login_issues_token_and_rejects_bad_credentials() {
    let app = test_app();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/login",
            None,
            Some(json!({ "username": "nurse1", "password": "nursepw" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "hc");
    assert_eq!(body["location"], "Ban Puan Phu HPH");
    assert_eq!(body["token_type"], "bearer");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/login",
            None,
            Some(json!({ "username": "nurse1", "password": "wrong" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let app = test_app();
    let (status, _) = send(&app, request("GET", "/patients", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/patients", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn red_reading_drives_the_full_referral_flow() {
    let app = test_app();
    let clerk = login(&app, "clerk", "clerkpw").await;

    let (status, patient) = send(
        &app,
        request(
            "POST",
            "/patients",
            Some(&clerk),
            Some(json!({
                "hn": "650001",
                "name": "Somchai Test",
                "cid": "1100200300401",
                "hc_zone": "Ban Puan Phu HPH"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{patient}");

    let (status, appointment) = send(
        &app,
        request(
            "POST",
            "/appointments",
            Some(&clerk),
            Some(json!({
                "patient_id": patient["id"],
                "appointment_date": "2024-03-15",
                "req_bp": true,
                "req_bs": true
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{appointment}");
    assert_eq!(appointment["status"], "pending");
    let id = appointment["id"].as_i64().expect("id");

    // The zone's nurse records a confirmatory red blood pressure.
    let nurse = login(&app, "nurse1", "nursepw").await;
    let (status, visited) = send(
        &app,
        request(
            "PUT",
            &format!("/appointments/{id}/visit"),
            Some(&nurse),
            Some(json!({
                "bp_sys": 120, "bp_dia": 80,
                "bp_sys_2": 165, "bp_dia_2": 90,
                "blood_sugar": 100
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{visited}");
    assert_eq!(visited["status"], "referred_back");
    let note = visited["refer_back_note"].as_str().expect("note");
    assert!(note.contains("BP round 2 (165/90)"), "note was: {note}");

    // A second visit entry is rejected: the appointment left pending.
    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/appointments/{id}/visit"),
            Some(&nurse),
            Some(json!({
                "bp_sys": 120, "bp_dia": 80,
                "bp_sys_2": 120, "bp_dia_2": 80,
                "blood_sugar": 100
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The referred visit shows up in the export with a red risk.
    let (status, rows) = send(
        &app,
        request("GET", "/appointments/export", Some(&clerk), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["date"], "15/03/2567");
    assert_eq!(rows[0]["bp_round_2"], "165/90");
    assert_eq!(rows[0]["risk"], "red");
}

#[tokio::test]
async fn hc_callers_only_see_their_zone() {
    let app = test_app();
    let clerk = login(&app, "clerk", "clerkpw").await;

    for (hn, cid, zone) in [
        ("650001", "1100200300401", "Ban Puan Phu HPH"),
        ("650002", "1100200300402", "Nong Hin Hospital"),
    ] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/patients",
                Some(&clerk),
                Some(json!({ "hn": hn, "name": "Test", "cid": cid, "hc_zone": zone })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let nurse = login(&app, "nurse1", "nursepw").await;
    let (status, body) = send(&app, request("GET", "/patients", Some(&nurse), None)).await;
    assert_eq!(status, StatusCode::OK);
    let patients = body.as_array().expect("array");
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0]["hc_zone"], "Ban Puan Phu HPH");

    // Searching the out-of-zone HN reads as not found, not forbidden.
    let (status, _) = send(
        &app,
        request("GET", "/patients/search?hn=650002", Some(&nurse), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // HC staff cannot schedule appointments.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/appointments",
            Some(&nurse),
            Some(json!({ "patient_id": 1, "appointment_date": "2024-03-15" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn batch_reports_the_tally_and_cart_decision() {
    let app = test_app();
    let clerk = login(&app, "clerk", "clerkpw").await;

    let (_, patient) = send(
        &app,
        request(
            "POST",
            "/patients",
            Some(&clerk),
            Some(json!({ "hn": "650001", "name": "Test", "cid": "1100200300401" })),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/appointments/batch",
            Some(&clerk),
            Some(json!([
                { "patient_id": patient["id"], "appointment_date": "2024-03-15" },
                { "patient_id": 99999, "appointment_date": "2024-03-15" }
            ])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["clear_cart"], true);
}

#[tokio::test]
async fn admin_manages_accounts_and_duplicates_conflict() {
    let app = test_app();
    let admin = login(&app, "admin", "admin1234").await;
    let clerk = login(&app, "clerk", "clerkpw").await;

    // Non-admin is refused.
    let (status, _) = send(&app, request("GET", "/users", Some(&clerk), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let new_user = json!({
        "username": "nurse2",
        "password": "pw",
        "role": "hc",
        "location_name": "Nong Hin Hospital"
    });
    let (status, created) = send(
        &app,
        request("POST", "/users", Some(&admin), Some(new_user.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert!(created.get("password_hash").is_none(), "hash must not leak");

    let (status, _) = send(&app, request("POST", "/users", Some(&admin), Some(new_user))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The new account can log in immediately.
    login(&app, "nurse2", "pw").await;
}

#[tokio::test]
async fn home_opd_entries_are_scoped_like_patients() {
    let app = test_app();
    let clerk = login(&app, "clerk", "clerkpw").await;
    let nurse = login(&app, "nurse1", "nursepw").await;

    let (status, entry) = send(
        &app,
        request(
            "POST",
            "/home-opd",
            Some(&nurse),
            Some(json!({ "cid": "1100200300401", "kind": "patient" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert_eq!(entry["source"], "hc");
    assert_eq!(entry["location"], "Ban Puan Phu HPH");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/home-opd",
            Some(&clerk),
            Some(json!({ "kind": "osm" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "needs cid or patient_id");

    let (_, visible) = send(&app, request("GET", "/home-opd", Some(&nurse), None)).await;
    assert_eq!(visible.as_array().expect("array").len(), 1);
}
