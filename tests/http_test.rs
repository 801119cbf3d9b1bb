//! Transport-level contract tests for the audit HTTP surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use compliance_scout::core::services::{Ocr, ReasonRequest, Reasoner, Services, Transcriber};
use compliance_scout::http;
use compliance_scout::{AuditError, MemoryStore, Pipeline, PipelineConfig};

struct CompliantReasoner;

#[async_trait]
impl Reasoner for CompliantReasoner {
    async fn generate(&self, _request: &ReasonRequest) -> Result<String, AuditError> {
        Ok(r#"{"score": 0, "status": "Compliant", "summary": "No issues.", "violations": []}"#
            .to_string())
    }
}

struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, AuditError> {
        Err(AuditError::Unsupported("no transcriber in tests".to_string()))
    }
}

struct NoOcr;

#[async_trait]
impl Ocr for NoOcr {
    async fn recognize_image(
        &self,
        _image: &[u8],
        _languages: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        Err(AuditError::Unsupported("no OCR in tests".to_string()))
    }

    async fn recognize_pdf_page(
        &self,
        _pdf: &[u8],
        _page: u32,
        _scale: f32,
        _languages: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        Err(AuditError::Unsupported("no OCR in tests".to_string()))
    }
}

fn router_with_reasoner(reasoner: Arc<dyn Reasoner>) -> axum::Router {
    let mut config = PipelineConfig::defaults();
    config.rules_dir = std::env::temp_dir().join("compliance-scout-http-no-rules");
    config.enable_failsafe_reanalysis = false;

    let services = Services::new(
        Arc::new(config),
        reasoner,
        Arc::new(NoTranscriber),
        Arc::new(NoOcr),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    http::router(Arc::new(Pipeline::new(services)))
}

fn test_router() -> axum::Router {
    router_with_reasoner(Arc::new(CompliantReasoner))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn post_audit_returns_created_report() {
    let router = test_router();
    let request = Request::builder()
        .method("POST")
        .uri("/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "tester")
        .body(Body::from(
            r#"{"text": "A plain product announcement.", "category": "general", "country": "India"}"#,
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(location.starts_with("/audit/"));

    let report = body_json(response).await;
    assert_eq!(report["status"], "Compliant");
    assert_eq!(report["score"], 0);
    assert!(report["modelUsed"].is_string());
    assert!(report["processingTimeMs"].is_number());
}

#[tokio::test]
async fn post_audit_without_user_is_unauthorized() {
    let router = test_router();
    let request = Request::builder()
        .method("POST")
        .uri("/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text": "hello"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_audit_without_text_or_url_is_bad_request() {
    let router = test_router();
    let request = Request::builder()
        .method("POST")
        .uri("/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "tester")
        .body(Body::from(r#"{"category": "general"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn created_audit_is_retrievable_by_id_and_history() {
    let router = test_router();

    let request = Request::builder()
        .method("POST")
        .uri("/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "tester")
        .body(Body::from(r#"{"text": "A plain product announcement."}"#))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();

    let get_request = Request::builder()
        .method("GET")
        .uri(&location)
        .body(Body::empty())
        .unwrap();
    let get_response = router.clone().oneshot(get_request).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    let record = body_json(get_response).await;
    assert_eq!(record["userId"], "tester");
    assert_eq!(record["contentType"], "text");

    let history_request = Request::builder()
        .method("GET")
        .uri("/history?limit=5&skip=0")
        .header("x-user-id", "tester")
        .body(Body::empty())
        .unwrap();
    let history_response = router.oneshot(history_request).await.unwrap();
    assert_eq!(history_response.status(), StatusCode::OK);
    let history = body_json(history_response).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

/// Signals in-flight work being torn down: the flag flips when the model
/// call's future is dropped, which only happens once cancellation reaches
/// the reasoner adapter.
struct StopFlag(Arc<AtomicBool>);

impl Drop for StopFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A reasoner whose call never finishes on its own. `started` fires when the
/// call is in flight; `work_stopped` flips only when the call is torn down.
struct HangingReasoner {
    started: Arc<Notify>,
    work_stopped: Arc<AtomicBool>,
}

#[async_trait]
impl Reasoner for HangingReasoner {
    async fn generate(&self, _request: &ReasonRequest) -> Result<String, AuditError> {
        self.started.notify_one();
        let _flag = StopFlag(self.work_stopped.clone());
        std::future::pending::<()>().await;
        unreachable!("pending future never completes")
    }
}

#[tokio::test]
async fn dropped_request_cancels_inflight_audit() {
    let started = Arc::new(Notify::new());
    let work_stopped = Arc::new(AtomicBool::new(false));
    let router = router_with_reasoner(Arc::new(HangingReasoner {
        started: started.clone(),
        work_stopped: work_stopped.clone(),
    }));

    let request = Request::builder()
        .method("POST")
        .uri("/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "tester")
        .body(Body::from(r#"{"text": "A claim the model never finishes judging."}"#))
        .unwrap();

    let handler = tokio::spawn(async move { router.oneshot(request).await });

    // Wait until the model call is actually in flight.
    started.notified().await;
    assert!(!work_stopped.load(Ordering::SeqCst));

    // Simulate the client disconnecting: axum drops the handler future.
    handler.abort();

    // Cancellation must reach the audit task and tear down the model call.
    let mut stopped = false;
    for _ in 0..200 {
        if work_stopped.load(Ordering::SeqCst) {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(
        stopped,
        "in-flight reasoner work kept running after the request was dropped"
    );
}

#[tokio::test]
async fn unknown_audit_id_is_not_found() {
    let router = test_router();
    let request = Request::builder()
        .method("GET")
        .uri("/audit/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
