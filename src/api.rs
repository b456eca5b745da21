//! HTTP surface for Rusty Digest.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /summaries` – Decode a base64 PDF upload, extract its text, and return a summary sized
//!   to `summaryType` (`flash` | `detailed` | `extra`).
//! - `POST /summaries/text` – Summarize text that was already extracted by the caller.
//! - `GET /metrics` – Observe summarization counters.
//! - `GET /health` – Liveness probe.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Handlers are thin adapters: every request goes through the same [`SummaryApi`] pipeline the
//! CLI uses, and failures are reported with the pipeline stage that produced them.

use crate::extract::ExtractionError;
use crate::processing::{
    DocumentMetadata, PipelineError, PipelineStage, SourceDocument, SummaryApi, SummaryOutcome,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the summarization API surface.
///
/// `max_body_bytes` bounds the JSON request body; base64 uploads need roughly 4/3 of the PDF size.
pub fn create_router<S>(service: Arc<S>, max_body_bytes: usize) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/summaries", post(summarize_upload::<S>))
        .route("/summaries/text", post(summarize_text::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/health", get(health))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(service)
}

/// Uploaded file as sent by the browser form.
#[derive(Deserialize)]
struct UploadedFile {
    /// Original file name, used for logging only.
    #[serde(default)]
    name: Option<String>,
    /// File contents, base64 encoded (a `data:` URL prefix is tolerated).
    base64: String,
}

/// Request body for `POST /summaries`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    file: UploadedFile,
    summary_type: String,
}

/// Request body for `POST /summaries/text`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextRequest {
    text: String,
    summary_type: String,
    #[serde(default)]
    metadata: DocumentMetadata,
}

/// Success envelope shared by both summary endpoints.
#[derive(Serialize)]
struct SummaryResponse {
    success: bool,
    #[serde(flatten)]
    outcome: SummaryOutcome,
}

/// Summarize an uploaded PDF.
async fn summarize_upload<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let UploadRequest { file, summary_type } = request;
    let bytes = decode_upload(&file.base64)?;
    tracing::info!(
        file = file.name.as_deref().unwrap_or("(unnamed)"),
        bytes = bytes.len(),
        tier = %summary_type,
        "Summary requested"
    );
    let outcome = service.summarize_pdf(bytes, &summary_type).await?;
    Ok(Json(SummaryResponse {
        success: true,
        outcome,
    }))
}

/// Summarize caller-supplied text.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let TextRequest {
        text,
        summary_type,
        metadata,
    } = request;
    tracing::info!(chars = text.chars().count(), tier = %summary_type, "Text summary requested");
    let outcome = service
        .summarize_text(SourceDocument::new(text, metadata), &summary_type)
        .await?;
    Ok(Json(SummaryResponse {
        success: true,
        outcome,
    }))
}

fn decode_upload(encoded: &str) -> Result<Vec<u8>, AppError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|error| AppError::BadRequest(format!("file.base64 is not valid base64: {error}")))
}

/// Return the summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(service.metrics_snapshot())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summaries",
                description: "Summarize a base64-encoded PDF. summaryType is one of flash (~500 words), detailed (~2500 words), or extra (~7500 words).",
                request_example: Some(json!({
                    "file": { "name": "book.pdf", "base64": "JVBERi0xLjcK..." },
                    "summaryType": "flash"
                })),
            },
            CommandDescriptor {
                name: "summarize_text",
                method: "POST",
                path: "/summaries/text",
                description: "Summarize already-extracted text with the same tiers as /summaries.",
                request_example: Some(json!({
                    "text": "Chapter one. It was a bright cold day in April.",
                    "summaryType": "detailed",
                    "metadata": { "title": "1984", "author": "George Orwell" }
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Pipeline(PipelineError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(error) => match error {
                PipelineError::InvalidTier(_) => StatusCode::BAD_REQUEST,
                PipelineError::Extraction(ExtractionError::TooLarge { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                PipelineError::Extraction(ExtractionError::Task(_)) | PipelineError::Chunking(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                PipelineError::Extraction(_) | PipelineError::EmptyDocument => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PipelineError::ChunkSummarization { .. } | PipelineError::Synthesis(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::BadRequest(message) => json!({
                "success": false,
                "stage": PipelineStage::Idle,
                "kind": "bad_request",
                "message": message,
            }),
            Self::Pipeline(error) => {
                let mut body = json!({
                    "success": false,
                    "stage": error.stage(),
                    "kind": error.kind(),
                    "message": error.to_string(),
                });
                if let PipelineError::ChunkSummarization { index, .. } = error {
                    body["chunkIndex"] = json!(index);
                }
                body
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        DocumentMetadata, PipelineError, SourceDocument, SummaryApi, SummaryOutcome, SummaryTier,
    };
    use crate::summarization::GenerationError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/summaries");
        assert!(summarize.description.contains("flash"));
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn upload_route_decodes_base64_and_returns_summary() {
        let service = Arc::new(StubSummaryService::succeeding());
        let app = create_router(service.clone(), 1024 * 1024);

        let payload = json!({
            "file": { "name": "book.pdf", "base64": "JVBERi0xLjcK" },
            "summaryType": "flash"
        });

        let response = app
            .oneshot(json_request("/summaries", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["summaryText"], "A short summary.");
        assert_eq!(json["tier"], "flash");
        assert_eq!(json["targetWordCount"], 500);

        let calls = service.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, b"%PDF-1.7\n".to_vec());
        assert_eq!(calls[0].1, "flash");
    }

    #[tokio::test]
    async fn upload_route_accepts_data_url_prefix() {
        let service = Arc::new(StubSummaryService::succeeding());
        let app = create_router(service.clone(), 1024 * 1024);

        let payload = json!({
            "file": { "base64": "data:application/pdf;base64,JVBERi0xLjcK" },
            "summaryType": "extra"
        });

        let response = app
            .oneshot(json_request("/summaries", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.calls.lock().await[0].0, b"%PDF-1.7\n".to_vec());
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected_before_the_pipeline() {
        let service = Arc::new(StubSummaryService::succeeding());
        let app = create_router(service.clone(), 1024 * 1024);

        let payload = json!({
            "file": { "base64": "***not base64***" },
            "summaryType": "flash"
        });

        let response = app
            .oneshot(json_request("/summaries", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_tier_maps_to_bad_request() {
        let service = Arc::new(StubSummaryService::failing(|| {
            PipelineError::from("weekly".parse::<SummaryTier>().unwrap_err())
        }));
        let app = create_router(service, 1024 * 1024);

        let payload = json!({ "text": "Some text.", "summaryType": "weekly" });
        let response = app
            .oneshot(json_request("/summaries/text", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["stage"], "idle");
        assert_eq!(json["kind"], "invalid_tier");
    }

    #[tokio::test]
    async fn chunk_failure_maps_to_bad_gateway_with_index() {
        let service = Arc::new(StubSummaryService::failing(|| {
            PipelineError::ChunkSummarization {
                index: 4,
                source: GenerationError::ProviderUnavailable("timeout".into()),
            }
        }));
        let app = create_router(service, 1024 * 1024);

        let payload = json!({ "text": "Some text.", "summaryType": "detailed" });
        let response = app
            .oneshot(json_request("/summaries/text", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["stage"], "summarizing");
        assert_eq!(json["chunkIndex"], 4);
    }

    #[tokio::test]
    async fn text_route_forwards_metadata() {
        let service = Arc::new(StubSummaryService::succeeding());
        let app = create_router(service.clone(), 1024 * 1024);

        let payload = json!({
            "text": "Body.",
            "summaryType": "detailed",
            "metadata": { "title": "Walden", "pageCount": 12 }
        });
        let response = app
            .oneshot(json_request("/summaries/text", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let documents = service.documents.lock().await;
        assert_eq!(documents[0].text, "Body.");
        assert_eq!(documents[0].metadata.title.as_deref(), Some("Walden"));
        assert_eq!(documents[0].metadata.page_count, Some(12));
    }

    fn json_request(uri: &str, payload: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    type ErrorFactory = fn() -> PipelineError;

    struct StubSummaryService {
        calls: Mutex<Vec<(Vec<u8>, String)>>,
        documents: Mutex<Vec<SourceDocument>>,
        failure: Option<ErrorFactory>,
    }

    impl StubSummaryService {
        fn succeeding() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                documents: Mutex::new(Vec::new()),
                failure: None,
            }
        }

        fn failing(factory: ErrorFactory) -> Self {
            Self {
                failure: Some(factory),
                ..Self::succeeding()
            }
        }

        fn respond(&self, tier: &str) -> Result<SummaryOutcome, PipelineError> {
            if let Some(factory) = self.failure {
                return Err(factory());
            }
            let tier: SummaryTier = tier.parse()?;
            Ok(SummaryOutcome {
                summary_text: "A short summary.".into(),
                tier,
                chunk_count: 1,
                target_word_count: tier.target_word_count(),
                word_count: 3,
                metadata: DocumentMetadata::default(),
            })
        }
    }

    #[async_trait]
    impl SummaryApi for StubSummaryService {
        async fn summarize_pdf(
            &self,
            bytes: Vec<u8>,
            tier: &str,
        ) -> Result<SummaryOutcome, PipelineError> {
            self.calls.lock().await.push((bytes, tier.to_string()));
            self.respond(tier)
        }

        async fn summarize_text(
            &self,
            document: SourceDocument,
            tier: &str,
        ) -> Result<SummaryOutcome, PipelineError> {
            self.documents.lock().await.push(document);
            self.respond(tier)
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
    }
}
