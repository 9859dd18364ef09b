use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use patientdesk::db::StaffCreation;
use patientdesk::models::{Gender, Hospital, NewStaff, NewToken, PatientPublic};
use patientdesk::password::BcryptVerifier;
use patientdesk::{router, AppState, CredentialStore, SqliteStore};
use serde_json::{json, Value};
use time::macros::date;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

fn patient(first_en: &str, first_th: &str, national_id: &str) -> PatientPublic {
    PatientPublic {
        first_name_th: first_th.to_string(),
        middle_name_th: String::new(),
        last_name_th: "ใจดี".to_string(),
        first_name_en: first_en.to_string(),
        middle_name_en: String::new(),
        last_name_en: "Jaidee".to_string(),
        date_of_birth: date!(1990 - 04 - 12),
        patient_hn: format!("HN-{national_id}"),
        national_id: national_id.to_string(),
        passport_id: String::new(),
        phone_number: "0812345678".to_string(),
        email: format!("{}@example.com", first_en.to_lowercase()),
        gender: Gender::Male,
    }
}

struct TestApp {
    store: Arc<SqliteStore>,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let hospitals = [
            Hospital {
                id: 1,
                name: "Siriraj".into(),
                location: "Bangkok".into(),
            },
            Hospital {
                id: 2,
                name: "Maharaj".into(),
                location: "Chiang Mai".into(),
            },
        ];
        let patients = [
            (1, patient("Somchai", "สมชาย", "1100000000001")),
            (1, patient("Anan", "อนันต์", "1100000000002")),
            (2, patient("Somsak", "สมศักดิ์", "1100000000003")),
        ];
        store.import(&hospitals, &patients).unwrap();

        let state = AppState::new(
            store.clone(),
            Arc::new(BcryptVerifier::new(4)),
            Duration::hours(24),
        );
        Self {
            store,
            app: router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::get(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn register_and_login(&self, username: &str, hospital: i64) -> String {
        let (status, _) = self
            .post(
                "/staff/create",
                json!({
                    "username": username,
                    "password": "password123",
                    "name": "Test User",
                    "email": "test@example.com",
                    "hospital": hospital
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .post(
                "/staff/login",
                json!({ "username": username, "password": "password123", "hospital": hospital }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn register_returns_public_staff() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/staff/create",
            json!({
                "username": "testuser",
                "password": "password123",
                "name": "Test User",
                "email": "test@example.com",
                "hospital": 1
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "testuser");
    assert_eq!(body["data"]["hospital_id"], 1);
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_unknown_hospital_is_404() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/staff/create",
            json!({ "username": "testuser", "password": "password123", "name": "T", "hospital": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Hospital not found" }));
}

#[tokio::test]
async fn register_duplicate_username_is_400() {
    let app = TestApp::new();
    app.register_and_login("testuser", 1).await;
    let (status, body) = app
        .post(
            "/staff/create",
            json!({ "username": "testuser", "password": "other", "name": "T", "hospital": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Username already exists" }));
}

#[tokio::test]
async fn register_with_missing_fields_is_400() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/staff/create", json!({ "username": "testuser" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_issues_a_day_long_token() {
    let app = TestApp::new();
    app.post(
        "/staff/create",
        json!({ "username": "testuser", "password": "password123", "name": "T", "hospital": 1 }),
    )
    .await;

    let before = OffsetDateTime::now_utc();
    let (status, body) = app
        .post(
            "/staff/login",
            json!({ "username": "testuser", "password": "password123", "hospital": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let token = body["data"]["token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let expires_at = OffsetDateTime::parse(
        body["data"]["expires_at"].as_str().unwrap(),
        &time::format_description::well_known::Rfc3339,
    )
    .unwrap();
    let window = expires_at - before;
    assert!(window > Duration::hours(24) - Duration::minutes(1));
    assert!(window <= Duration::hours(24));

    assert_eq!(body["data"]["staff"]["username"], "testuser");
    assert_eq!(body["data"]["staff"]["hospital_id"], 1);
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let app = TestApp::new();
    app.register_and_login("testuser", 1).await;
    let (status, body) = app
        .post(
            "/staff/login",
            json!({ "username": "testuser", "password": "nope", "hospital": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid credentials" }));
}

#[tokio::test]
async fn lookup_by_national_id() {
    let app = TestApp::new();
    let (status, body) = app.get("/patient/search/1100000000001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name_en"], "Somchai");
    assert_eq!(body["date_of_birth"], "1990-04-12");
    assert!(body.get("id").is_none());
    assert!(body.get("hospital_id").is_none());
}

#[tokio::test]
async fn lookup_unknown_patient_is_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/patient/search/9999999999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Patient not found" }));
}

#[tokio::test]
async fn search_requires_a_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/patient/search", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Authentication required" }));

    let (status, body) = app
        .get("/patient/search", Some("Bearer not-a-real-token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid token" }));
}

#[tokio::test]
async fn search_with_expired_token_removes_it() {
    let app = TestApp::new();
    let created = app
        .store
        .create_staff(&NewStaff {
            username: "testuser".into(),
            password_hash: "unused".into(),
            name: "Test User".into(),
            email: String::new(),
            hospital_id: 1,
        })
        .unwrap();
    let StaffCreation::Created(staff) = created else {
        panic!("staff not created");
    };
    let created_at = OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .unwrap()
        - Duration::hours(48);
    app.store
        .insert_token(&NewToken {
            token: "expired-token-12345".into(),
            staff_id: staff.id,
            hospital_id: 1,
            created_at,
            expires_at: created_at + Duration::hours(24),
        })
        .unwrap()
        .unwrap();

    let (status, body) = app
        .get("/patient/search", Some("Bearer expired-token-12345"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Token expired" }));
    assert!(app.store.find_token("expired-token-12345").unwrap().is_none());
}

#[tokio::test]
async fn empty_search_returns_the_callers_hospital() {
    let app = TestApp::new();
    let token = app.register_and_login("testuser", 1).await;

    let (status, body) = app
        .get("/patient/search", Some(&format!("Bearer {token}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["first_name_en"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Somchai", "Anan"]);
}

#[tokio::test]
async fn search_never_crosses_hospitals() {
    let app = TestApp::new();
    let token = app.register_and_login("testuser", 1).await;

    // "Som" matches Somchai (hospital 1) and Somsak (hospital 2).
    let (status, body) = app
        .get("/patient/search?first_name=Som", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["first_name_en"], "Somchai");
}

#[tokio::test]
async fn search_matches_thai_script_names() {
    let app = TestApp::new();
    let token = app.register_and_login("testuser", 1).await;

    let (status, body) = app
        .get(
            "/patient/search?first_name=%E0%B8%AD%E0%B8%99%E0%B8%B1%E0%B8%99",
            Some(&format!("Bearer {token}")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["first_name_en"], "Anan");
}

#[tokio::test]
async fn search_without_matches_is_an_empty_list() {
    let app = TestApp::new();
    let token = app.register_and_login("testuser", 1).await;

    let (status, body) = app
        .get(
            "/patient/search?national_id=1100000000001&date_of_birth=2000-01-01",
            Some(&format!("Bearer {token}")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": [] }));
}

#[tokio::test]
async fn search_with_bad_date_is_400() {
    let app = TestApp::new();
    let token = app.register_and_login("testuser", 1).await;

    let (status, body) = app
        .get(
            "/patient/search?date_of_birth=12%2F04%2F1990",
            Some(&format!("Bearer {token}")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
