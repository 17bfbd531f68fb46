//! Route definitions for the docchat server.
//!
//! Provides HTTP endpoints for document upload, querying, chat history,
//! session cleanup, and health checks.

use crate::pipeline::QueryPipeline;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use docchat_common::Error;
use docchat_session::{ChatTurn, DocumentLoader, SessionStore, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::Instrument;

/// Upload extensions accepted before any store mutation.
const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".txt"];

/// Maximum accepted upload body.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub vector_store: Arc<dyn VectorStore>,
    pub loader: Arc<dyn DocumentLoader>,
    pub pipeline: Arc<QueryPipeline>,
}

/// Query request body.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub session_id: String,
    pub query: String,
}

/// Query response.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Chat history request body.
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub session_id: String,
}

/// Chat history response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub chat_history: Vec<ChatTurn>,
}

/// Cleanup request body.
#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    pub session_id: String,
}

/// Generic acknowledgement response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: Error) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.kind().to_string(),
        }),
    )
}

/// Lowercased extension of a filename, including the dot.
fn file_extension(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|idx| filename[idx..].to_lowercase())
}

/// Reject any file outside the allow-list, before any mutation happens.
fn validate_extensions(filenames: &[String]) -> Result<(), Error> {
    for name in filenames {
        let ext = file_extension(name)
            .ok_or_else(|| Error::UnsupportedFileType(format!("{name} has no extension")))?;
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::UnsupportedFileType(format!(
                "File type {ext} is not supported"
            )));
        }
    }
    Ok(())
}

/// Build the complete router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/query", post(query_handler))
        .route("/chat_history", post(chat_history_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/health", get(health_handler))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handle document uploads: validate, extract text, index embeddings, and
/// store session metadata.
async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut session_id: Option<String> = None;
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(Error::InvalidInput(format!("malformed multipart body: {e}")))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("session_id") => {
                let value = field.text().await.map_err(|e| {
                    error_response(Error::InvalidInput(format!("invalid session_id field: {e}")))
                })?;
                session_id = Some(value);
            }
            Some("files") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        error_response(Error::InvalidInput("file field without a filename".into()))
                    })?;
                let content = field.bytes().await.map_err(|e| {
                    error_response(Error::InvalidInput(format!("failed to read {filename}: {e}")))
                })?;
                files.push((filename, content.to_vec()));
            }
            _ => {}
        }
    }

    let session_id = session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| error_response(Error::InvalidInput("session_id is required".into())))?;
    if files.is_empty() {
        return Err(error_response(Error::InvalidInput(
            "at least one file is required".into(),
        )));
    }

    let filenames: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
    validate_extensions(&filenames).map_err(error_response)?;

    let mut extracted_text = String::new();
    for (filename, content) in &files {
        let text = state
            .loader
            .extract_text(content, filename)
            .await
            .map_err(|e| {
                error_response(Error::InvalidInput(format!(
                    "failed to extract text from {filename}: {e}"
                )))
            })?;
        extracted_text.push_str(&text);
        extracted_text.push('\n');
    }

    state
        .vector_store
        .index(&session_id, &extracted_text)
        .await
        .map_err(|e| error_response(Error::StoreUnavailable(format!("indexing failed: {e}"))))?;

    state.store.save(&session_id, filenames).await;

    tracing::info!(session_id = %session_id, files = files.len(), "Files processed");
    Ok(Json(MessageResponse {
        message: "Files processed successfully".into(),
    }))
}

/// Handle user queries through the pipeline.
async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if request.session_id.is_empty() || request.query.is_empty() {
        return Err(error_response(Error::InvalidInput(
            "session_id and query are required".into(),
        )));
    }

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("query", %request_id, session_id = %request.session_id);

    let answer = state
        .pipeline
        .run(&request.session_id, &request.query)
        .instrument(span)
        .await
        .map_err(error_response)?;

    Ok(Json(QueryResponse { response: answer }))
}

/// Return the ordered chat history for a session.
async fn chat_history_handler(
    State(state): State<AppState>,
    Json(request): Json<HistoryRequest>,
) -> Json<HistoryResponse> {
    let chat_history = state.store.history(&request.session_id).await;
    Json(HistoryResponse { chat_history })
}

/// End a session: drop cached state and delete its embeddings.
async fn cleanup_handler(
    State(state): State<AppState>,
    Json(request): Json<CleanupRequest>,
) -> Json<MessageResponse> {
    state.store.delete(&request.session_id).await;

    // Same deletion call the expiry watcher makes; failure is a bounded
    // leak that must be visible in logs, not a failed acknowledgement.
    if let Err(e) = state.vector_store.delete_session(&request.session_id).await {
        tracing::error!(
            session_id = %request.session_id,
            error = %e,
            "Failed to delete embeddings for ended session"
        );
    }

    Json(MessageResponse {
        message: format!("Session {} cleaned up", request.session_id),
    })
}

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "docchat-server".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::KeywordVectorStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use docchat_llm::{
        GenerateRequest, LlmProvider, Orchestrator, PromptBuilder, ProviderError, RetryConfig,
    };
    use docchat_session::PlainTextLoader;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    struct CannedProvider;

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _request: GenerateRequest) -> Result<String, ProviderError> {
            Ok("canned answer".to_string())
        }
    }

    /// Vector store wrapper counting `delete_session` calls.
    struct CountingVectorStore {
        inner: KeywordVectorStore,
        deletes: AtomicUsize,
    }

    impl CountingVectorStore {
        fn new(chunk_length: usize) -> Self {
            Self {
                inner: KeywordVectorStore::new(chunk_length),
                deletes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VectorStore for CountingVectorStore {
        async fn index(&self, session_id: &str, text: &str) -> anyhow::Result<()> {
            self.inner.index(session_id, text).await
        }

        async fn retrieve(&self, session_id: &str, query: &str) -> anyhow::Result<Vec<String>> {
            self.inner.retrieve(session_id, query).await
        }

        async fn delete_session(&self, session_id: &str) -> anyhow::Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_session(session_id).await
        }
    }

    fn router_with_store(vector_store: Arc<dyn VectorStore>) -> (Router, Arc<SessionStore>) {
        let (store, _rx) = SessionStore::new(Duration::from_secs(1800));
        let store = Arc::new(store);
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(CannedProvider),
            PromptBuilder::new(10, 8000),
            RetryConfig {
                attempts: 1,
                min_wait: Duration::from_millis(1),
                max_wait: Duration::from_millis(1),
            },
            4,
            "test-model",
            0.7,
        ));
        let pipeline = Arc::new(QueryPipeline::new(
            Arc::clone(&store),
            Arc::clone(&vector_store),
            orchestrator,
        ));

        let router = build_router(AppState {
            store: Arc::clone(&store),
            vector_store,
            loader: Arc::new(PlainTextLoader),
            pipeline,
        });
        (router, store)
    }

    fn test_router() -> Router {
        let (router, _store) = router_with_store(Arc::new(KeywordVectorStore::new(2000)));
        router
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn allowed_extensions_pass_validation() {
        let files = vec!["a.txt".to_string(), "b.PDF".to_string(), "c.docx".to_string()];
        assert!(validate_extensions(&files).is_ok());
    }

    #[test]
    fn disallowed_extension_is_rejected() {
        let files = vec!["a.txt".to_string(), "evil.exe".to_string()];
        let err = validate_extensions(&files).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn file_without_extension_is_rejected() {
        let files = vec!["README".to_string()];
        assert!(validate_extensions(&files).is_err());
    }

    #[test]
    fn error_response_maps_status_and_kind() {
        let (status, Json(body)) = error_response(Error::Generation("backend gone".into()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.code, "generation_error");

        let (status, Json(body)) = error_response(Error::UnsupportedFileType(".exe".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "unsupported_file_type");
    }

    #[tokio::test]
    async fn health_endpoint_reports_service() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "docchat-server");
    }

    #[tokio::test]
    async fn query_returns_generated_answer_and_appends_history() {
        let router = test_router();

        let response = router
            .clone()
            .oneshot(json_request(
                "/query",
                serde_json::json!({"session_id": "s1", "query": "hello?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response"], "canned answer");

        let response = router
            .oneshot(json_request(
                "/chat_history",
                serde_json::json!({"session_id": "s1"}),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["chat_history"][0]["question"], "hello?");
        assert_eq!(body["chat_history"][0]["answer"], "canned answer");
    }

    #[tokio::test]
    async fn query_with_empty_fields_is_rejected() {
        let response = test_router()
            .oneshot(json_request(
                "/query",
                serde_json::json!({"session_id": "", "query": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn history_of_unknown_session_is_empty() {
        let response = test_router()
            .oneshot(json_request(
                "/chat_history",
                serde_json::json!({"session_id": "missing"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["chat_history"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn cleanup_acknowledges_session() {
        let response = test_router()
            .oneshot(json_request(
                "/cleanup",
                serde_json::json!({"session_id": "s9"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Session s9 cleaned up");
    }

    #[tokio::test]
    async fn cleanup_deletes_embeddings_exactly_once() {
        let vector_store = Arc::new(CountingVectorStore::new(2000));
        let (router, store) =
            router_with_store(Arc::clone(&vector_store) as Arc<dyn VectorStore>);

        // Upload side effects as the handler performs them.
        vector_store
            .index("s1", "quarterly report totals")
            .await
            .unwrap();
        store.save("s1", vec!["report.txt".into()]).await;

        let response = router
            .oneshot(json_request(
                "/cleanup",
                serde_json::json!({"session_id": "s1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Ending a session issues exactly one embedding deletion, and both
        // stores end up without the session.
        assert_eq!(vector_store.deletes.load(Ordering::SeqCst), 1);
        assert!(store.get("s1").await.is_none());
        assert!(vector_store
            .retrieve("s1", "report")
            .await
            .unwrap()
            .is_empty());
    }
}
