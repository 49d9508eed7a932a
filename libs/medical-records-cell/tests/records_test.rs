use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medical_records_cell::medical_records_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

// "%PDF"
const PDF_BASE64: &str = "JVBERg==";

struct TestApp {
    server: MockServer,
    config: TestConfig,
}

impl TestApp {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let config = TestConfig::with_url(&server.uri());
        Self { server, config }
    }

    fn router(&self) -> Router {
        medical_records_routes(Arc::new(self.config.to_app_config()))
    }

    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None)
    }
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");

    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn upload_body(patient_id: &str, file_name: &str) -> Value {
    json!({
        "patient_id": patient_id,
        "file_name": file_name,
        "content_base64": format!("data:application/pdf;base64,{}", PDF_BASE64),
        "type": "Lab result"
    })
}

#[tokio::test]
async fn doctor_uploads_record_to_bucket_then_table() {
    let app = TestApp::start().await;
    let doctor = TestUser::doctor("doc@clinic.example");
    let patient = TestUser::patient("ana@clinic.example");

    Mock::given(method("POST"))
        .and(path_regex(format!(r"^/storage/v1/object/medical-records/{}/\d+_scan\.pdf$", patient.id)))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "medical-records/x" })))
        .expect(1)
        .mount(&app.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .and(body_partial_json(json!({
            "patient_id": patient.id,
            "doctor_id": doctor.id,
            "file_name": "scan.pdf",
            "file_type": "application/pdf",
            "file_size": 4,
            "type": "Lab result"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::medical_record_response(&patient.id, &doctor.id, "p/1_scan.pdf")
        ])))
        .expect(1)
        .mount(&app.server)
        .await;

    let response = app
        .router()
        .oneshot(request("POST", "/", &app.token(&doctor), Some(upload_body(&patient.id, "scan.pdf"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["record"]["file_name"], "scan.pdf");
}

#[tokio::test]
async fn failed_record_row_removes_stored_object() {
    let app = TestApp::start().await;
    let doctor = TestUser::doctor("doc@clinic.example");
    let patient = TestUser::patient("ana@clinic.example");
    let token = app.token(&doctor);
    let object = format!(r"^/storage/v1/object/medical-records/{}/\d+_scan\.pdf$", patient.id);

    Mock::given(method("POST"))
        .and(path_regex(object.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "medical-records/x" })))
        .expect(1)
        .mount(&app.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "insert failed" })))
        .mount(&app.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path_regex(object.as_str()))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&app.server)
        .await;

    let response = app
        .router()
        .oneshot(request("POST", "/", &token, Some(upload_body(&patient.id, "scan.pdf"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn patients_cannot_upload() {
    let app = TestApp::start().await;
    let patient = TestUser::patient("ana@clinic.example");

    let response = app
        .router()
        .oneshot(request("POST", "/", &app.token(&patient), Some(upload_body(&patient.id, "scan.pdf"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn disallowed_extension_is_rejected_before_storage() {
    let app = TestApp::start().await;
    let doctor = TestUser::doctor("doc@clinic.example");

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/.*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/",
            &app.token(&doctor),
            Some(upload_body(&Uuid::new_v4().to_string(), "payload.exe")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "File type .exe is not allowed");
}

#[tokio::test]
async fn patient_lists_own_records_only() {
    let app = TestApp::start().await;
    let doctor = TestUser::doctor("doc@clinic.example");
    let patient = TestUser::patient("ana@clinic.example");
    let other = TestUser::patient("bob@clinic.example");

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .and(query_param("order", "uploaded_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medical_record_response(&patient.id, &doctor.id, "a/2_scan.pdf"),
            MockSupabaseResponses::medical_record_response(&patient.id, &doctor.id, "a/1_scan.pdf")
        ])))
        .mount(&app.server)
        .await;

    let uri = format!("/patients/{}", patient.id);

    let response = app.router().oneshot(request("GET", &uri, &app.token(&patient), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["total"], 2);

    let response = app.router().oneshot(request("GET", &uri, &app.token(&other), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn download_returns_signed_url() {
    let app = TestApp::start().await;
    let doctor = TestUser::doctor("doc@clinic.example");
    let patient = TestUser::patient("ana@clinic.example");
    let file_path = format!("{}/1704877200000_scan.pdf", patient.id);

    let record = MockSupabaseResponses::medical_record_response(&patient.id, &doctor.id, &file_path);
    let record_id = record["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("id", format!("eq.{}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record])))
        .mount(&app.server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/sign/medical-records/{}", file_path)))
        .and(body_partial_json(json!({ "expiresIn": 60 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signedURL": format!("/object/sign/medical-records/{}?token=signed", file_path)
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let response = app
        .router()
        .oneshot(request("GET", &format!("/{}/download", record_id), &app.token(&patient), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["expires_in"], 60);
    assert_eq!(
        body["url"],
        format!("{}/storage/v1/object/sign/medical-records/{}?token=signed", app.server.uri(), file_path)
    );
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let app = TestApp::start().await;
    let patient = TestUser::patient("ana@clinic.example");

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;

    let response = app
        .router()
        .oneshot(request("GET", &format!("/{}/download", Uuid::new_v4()), &app.token(&patient), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
