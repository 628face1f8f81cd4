use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use reassessment_report::backend::{BackendClient, ReportSource};
use reassessment_report::{AppState, Config, routes};

const SAMPLE_REPORT: &str = "- **Student Details**:\r\n\
    - **Name**: Alice\r\n\
    - **Roll Number**: 42\r\n\
    - **Question-by-Question Evaluation**:\r\n\
    - **Question Number**: Q1\r\n\
    - **Original Question**: Explain photosynthesis\r\n\
    - **Mark Range**: 3-4\r\n\
    - **Suggestions for Improvement**: Add detail\r\n\
    about chlorophyll\r\n\
    - **Question Number**: Q2\r\n\
    - **Content Validity**: Partially valid";

async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

fn app_with(source: Arc<dyn ReportSource>) -> Router {
    let config = Config::from_lookup(|_| None).unwrap();
    routes::router(AppState { config, source })
}

fn client_for(base_url: &str, max_retries: u32) -> Arc<dyn ReportSource> {
    Arc::new(
        BackendClient::new(base_url, Duration::from_secs(5), max_retries)
            .unwrap()
            .with_retry_base(Duration::from_millis(10)),
    )
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn health_reports_service_name() {
    let app = app_with(client_for("http://127.0.0.1:9", 1));
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "reassessment-report");
}

#[tokio::test]
async fn segment_endpoint_returns_typed_sections() {
    let app = app_with(client_for("http://127.0.0.1:9", 1));
    let (status, bytes) =
        post_json(app, "/api/reports/segment", json!({ "report": SAMPLE_REPORT })).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "structured");
    assert!(body["warning"].is_null());
    assert_eq!(body["question_count"], 2);

    let sections = body["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 4);
    assert_eq!(sections[0]["type"], "student");
    assert_eq!(sections[0]["fields"]["Roll Number"], "42");
    assert_eq!(sections[1]["type"], "header");
    assert_eq!(sections[1]["title"], "Question-by-Question Evaluation");
    assert_eq!(sections[2]["index"], 0);
    assert_eq!(
        sections[2]["fields"]["Suggestions for Improvement"],
        "Add detail\nabout chlorophyll"
    );
    assert_eq!(sections[3]["index"], 1);
    assert_eq!(sections[3]["fields"]["Content Validity"], "Partially valid");
}

#[tokio::test]
async fn segment_endpoint_flags_empty_report() {
    let app = app_with(client_for("http://127.0.0.1:9", 1));
    let (status, bytes) = post_json(app, "/api/reports/segment", json!({ "report": "  " })).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "empty");
    assert_eq!(body["warning"], "No evaluation report available.");
    assert_eq!(body["sections"], json!([]));
}

#[tokio::test]
async fn render_endpoint_returns_markdown() {
    let app = app_with(client_for("http://127.0.0.1:9", 1));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/reports/render")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "report": SAMPLE_REPORT }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let markdown = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(markdown.contains("#### Q1: Explain photosynthesis"));
    assert!(markdown.contains("#### Question 2"));
    assert!(!markdown.starts_with('>'));
}

#[tokio::test]
async fn render_endpoint_warns_on_empty_and_unstructured_reports() {
    let app = app_with(client_for("http://127.0.0.1:9", 1));
    let (status, bytes) =
        post_json(app.clone(), "/api/reports/render", json!({ "report": "" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "> No evaluation report available.\n"
    );

    let (status, bytes) = post_json(
        app,
        "/api/reports/render",
        json!({ "report": "The model could not grade this file." }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let markdown = String::from_utf8(bytes).unwrap();
    assert!(markdown.starts_with(
        "> The report could not be parsed into sections; showing raw text.\n"
    ));
    assert!(markdown.contains("```text\nThe model could not grade this file.\n```"));
}

#[tokio::test]
async fn generate_endpoint_rejects_empty_file_paths() {
    let app = app_with(client_for("http://127.0.0.1:9", 1));
    let (status, bytes) =
        post_json(app, "/api/reports/generate", json!({ "file_paths": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "file_paths must not be empty");
}

#[tokio::test]
async fn generate_endpoint_segments_backend_report() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::<Value>::new()));
    let recorder = seen.clone();
    let backend = Router::new().route(
        "/api/v1/api/reports/generate",
        post(move |axum::Json(body): axum::Json<Value>| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(body);
                axum::Json(json!({ "status": "success", "data": SAMPLE_REPORT }))
            }
        }),
    );
    let base_url = spawn_backend(backend).await;

    let app = app_with(client_for(&base_url, 3));
    let (status, bytes) = post_json(
        app,
        "/api/reports/generate",
        json!({ "file_paths": ["uploads/alice.pdf", "uploads/extra.pdf"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["file_path"], "uploads/alice.pdf");
    assert_eq!(body["status"], "structured");
    assert_eq!(body["question_count"], 2);
    assert_eq!(body["sections"].as_array().unwrap().len(), 4);
    assert!(body["id"].is_string());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!({ "file_paths": ["uploads/alice.pdf"] })]
    );
}

#[tokio::test]
async fn backend_client_retries_server_errors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let backend = Router::new().route(
        "/api/v1/api/reports/generate",
        post(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        axum::Json(json!({ "status": "error", "message": "warming up" })),
                    )
                } else {
                    (
                        StatusCode::OK,
                        axum::Json(json!({ "status": "success", "data": "plain verdict" })),
                    )
                }
            }
        }),
    );
    let base_url = spawn_backend(backend).await;

    let client = client_for(&base_url, 3);
    let report = client
        .generate(&["uploads/a.pdf".to_string()])
        .await
        .unwrap();

    assert_eq!(report, "plain verdict");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn backend_client_does_not_retry_empty_report() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let backend = Router::new().route(
        "/api/v1/api/reports/generate",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                axum::Json(json!({ "status": "success", "data": "   " }))
            }
        }),
    );
    let base_url = spawn_backend(backend).await;

    let app = app_with(client_for(&base_url, 3));
    let (status, bytes) = post_json(
        app,
        "/api/reports/generate",
        json!({ "file_paths": ["uploads/a.pdf"] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "No report content was returned by the server.");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn backend_client_gives_up_after_max_retries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let backend = Router::new().route(
        "/api/v1/api/reports/generate",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "boom")
            }
        }),
    );
    let base_url = spawn_backend(backend).await;

    let client = client_for(&base_url, 2);
    let err = client
        .generate(&["uploads/a.pdf".to_string()])
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "backend returned 500 Internal Server Error: boom"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
