//! HTTP transport for the audit pipeline.
//!
//! `POST /audit` accepts JSON (`{text|url}`) or multipart (`file`) plus the
//! audit fields, and answers 201 with the report. `GET /audit/{id}` and
//! `GET /history` read from the audit store. Authentication is external;
//! the caller identity arrives as a `X-User-Id` header (or `userId` field).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::core::error::AuditError;
use crate::core::types::{AuditOptions, Input, Jurisdiction};
use crate::pipeline::Pipeline;

const MAX_JSON_BODY: usize = 1024 * 1024;

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/audit", post(post_audit))
        .route("/audit/{id}", get(get_audit))
        .route("/history", get(get_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

// ---------------------------------------------------------------------------
// Cancellation wiring
// ---------------------------------------------------------------------------

/// Cancels the audit when the request handler future is dropped. Axum drops
/// the handler when the client disconnects, so this is how a disconnect
/// reaches the in-flight fetches, subprocesses, and model calls.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

struct ApiError(AuditError);

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("audit request failed: {}", self.0);
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// POST /audit
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AuditBody {
    text: Option<String>,
    url: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    analysis_mode: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

struct ParsedRequest {
    input: Input,
    options: AuditOptions,
}

fn header_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn build_options(
    headers: &HeaderMap,
    user_id: Option<String>,
    category: Option<String>,
    analysis_mode: Option<String>,
    country: Option<String>,
    region: Option<String>,
) -> AuditOptions {
    AuditOptions {
        user_id: user_id
            .or_else(|| header_user_id(headers))
            .unwrap_or_default(),
        category: category.unwrap_or_else(|| "general".to_string()),
        jurisdiction: Jurisdiction {
            country: country.unwrap_or_default(),
            region,
        },
        analysis_mode: analysis_mode.unwrap_or_default(),
    }
}

async fn parse_json_request(
    headers: &HeaderMap,
    request: Request<Body>,
) -> Result<ParsedRequest, ApiError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|e| AuditError::InputInvalid(format!("unreadable body: {e}")))?;
    let body: AuditBody = serde_json::from_slice(&bytes)
        .map_err(|e| AuditError::InputInvalid(format!("invalid JSON body: {e}")))?;

    let input = match (&body.text, &body.url) {
        (Some(text), _) if !text.trim().is_empty() => Input::Text { body: text.clone() },
        (_, Some(url)) if !url.trim().is_empty() => Input::Url { href: url.clone() },
        _ => {
            return Err(AuditError::InputInvalid(
                "provide either 'text' or 'url'".to_string(),
            )
            .into())
        }
    };

    Ok(ParsedRequest {
        input,
        options: build_options(
            headers,
            body.user_id,
            body.category,
            body.analysis_mode,
            body.country,
            body.region,
        ),
    })
}

async fn parse_multipart_request(
    headers: &HeaderMap,
    mut multipart: Multipart,
) -> Result<ParsedRequest, ApiError> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut user_id = None;
    let mut category = None;
    let mut analysis_mode = None;
    let mut country = None;
    let mut region = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AuditError::InputInvalid(format!("multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AuditError::InputInvalid(format!("file read error: {e}")))?;
                file = Some((bytes.to_vec(), filename, mime));
            }
            other => {
                let value = field.text().await.unwrap_or_default();
                if value.trim().is_empty() {
                    continue;
                }
                match other {
                    "userId" => user_id = Some(value),
                    "category" => category = Some(value),
                    "analysisMode" => analysis_mode = Some(value),
                    "country" => country = Some(value),
                    "region" => region = Some(value),
                    _ => {}
                }
            }
        }
    }

    let Some((bytes, filename, mime)) = file else {
        return Err(AuditError::InputInvalid("missing 'file' part".to_string()).into());
    };

    Ok(ParsedRequest {
        input: Input::File {
            bytes,
            filename,
            mime,
        },
        options: build_options(headers, user_id, category, analysis_mode, country, region),
    })
}

async fn post_audit(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let parsed = if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AuditError::InputInvalid(format!("multipart parse: {e}")))?;
        parse_multipart_request(&headers, multipart).await?
    } else {
        parse_json_request(&headers, request).await?
    };

    // Run the audit on its own task and hold a guard that cancels it when
    // this handler future is dropped. The task keeps running just long
    // enough to observe the token, so subprocesses get the terminate /
    // grace / kill sequence instead of an abrupt teardown.
    let cancel = CancellationToken::new();
    let _guard = CancelOnDrop(cancel.clone());
    let audit = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.audit(parsed.input, parsed.options, cancel).await }
    });

    let outcome = audit
        .await
        .map_err(|e| AuditError::Internal(format!("audit task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/audit/{}", outcome.id))],
        Json(outcome.report),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// GET /audit/{id}, GET /history
// ---------------------------------------------------------------------------

async fn get_audit(
    State(pipeline): State<Arc<Pipeline>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match pipeline.services().store.get(&id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "audit not found" })),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    skip: Option<usize>,
}

async fn get_history(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    let Some(user_id) = header_user_id(&headers) else {
        return Err(AuditError::Unauthenticated.into());
    };
    let records = pipeline
        .services()
        .store
        .list(
            &user_id,
            query.limit.unwrap_or(20).min(100),
            query.skip.unwrap_or(0),
        )
        .await?;
    Ok(Json(records).into_response())
}
