//! HTTP upload shell around [`ReportAnalyzer`].
//!
//! One document is processed at a time: handlers take the single permit of
//! `AppState::permit` and hand it to the blocking pipeline job, which holds
//! it until the job returns even if the client goes away.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::Semaphore;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::processor::{ProcessingError, ReportAnalyzer, ReportDetails};
use crate::pipeline::summarize::SummarizeError;

/// Allowance for multipart framing on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    analyzer: Arc<ReportAnalyzer>,
    permit: Arc<Semaphore>,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(analyzer: Arc<ReportAnalyzer>, max_upload_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            analyzer,
            permit: Arc::new(Semaphore::new(1)),
            max_upload_bytes,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("File exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Not a PDF: {0}")]
    NotPdf(String),
    #[error("Unreadable PDF: {0}")]
    Unparsable(String),
    #[error("Summarizer unavailable: {0}")]
    Summarizer(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "NO_FILE",
                "Upload a PDF in the 'file' field".to_string(),
            ),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::TooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "TOO_LARGE",
                format!("File is larger than {} MB", limit / (1024 * 1024)),
            ),
            ApiError::NotPdf(detected) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "NOT_PDF",
                format!("Expected a PDF, got {detected}"),
            ),
            ApiError::Unparsable(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPARSABLE_PDF",
                detail.clone(),
            ),
            ApiError::Summarizer(detail) => {
                tracing::warn!(detail, "Summarizer failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "SUMMARIZER_UNAVAILABLE",
                    detail.clone(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: ErrorDetail { code, message } })).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Extraction(ExtractionError::UnsupportedFormat(mime)) => {
                ApiError::NotPdf(mime)
            }
            ProcessingError::Extraction(ExtractionError::PdfParsing(detail)) => {
                ApiError::Unparsable(detail)
            }
            ProcessingError::Summarize(SummarizeError::EmptyInput) => {
                ApiError::Unparsable("The PDF contains no extractable text".into())
            }
            ProcessingError::Summarize(e) => ApiError::Summarizer(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/", get(serve_upload_page))
        .route("/health", get(|| async { "ok" }))
        .route("/details", post(handle_details))
        .route("/analyze", post(handle_analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Upload server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down upload server");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn serve_upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE_HTML)
}

async fn handle_details(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ReportDetails>, ApiError> {
    let bytes = read_file_field(multipart, state.max_upload_bytes).await?;
    let details = run_exclusive(&state, move |analyzer| analyzer.read_details(&bytes)).await?;
    Ok(Json(details))
}

async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let bytes = read_file_field(multipart, state.max_upload_bytes).await?;
    let (report_id, pdf) = run_exclusive(&state, move |analyzer| {
        let analysis = analyzer.analyze(&bytes)?;
        let pdf = analyzer.render(&analysis)?;
        Ok((analysis.report_id, pdf))
    })
    .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.analyzer.output_file_name()
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::Internal(format!("Bad file name header: {e}")))?;
    let report_id = HeaderValue::from_str(&report_id.to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::HeaderName::from_static("x-report-id"), report_id),
        ],
        pdf,
    )
        .into_response())
}

/// Bytes of the multipart `file` field.
async fn read_file_field(mut multipart: Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e, limit)),
        };
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        tracing::debug!(size = bytes.len(), "Upload received");
        file_data = Some(bytes.to_vec());
    }

    let bytes = file_data.ok_or(ApiError::MissingFile)?;
    if bytes.is_empty() {
        return Err(ApiError::MissingFile);
    }
    if bytes.len() > limit {
        return Err(ApiError::TooLarge { limit });
    }
    Ok(bytes)
}

fn multipart_error(e: axum::extract::multipart::MultipartError, limit: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge { limit }
    } else {
        tracing::warn!("Failed to read upload: {e}");
        ApiError::BadRequest(e.body_text())
    }
}

/// Runs `job` on the blocking pool. The processing permit moves into the
/// blocking task and is released only when `job` returns.
async fn run_exclusive<T, F>(state: &Arc<AppState>, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ReportAnalyzer) -> Result<T, ProcessingError> + Send + 'static,
{
    let permit = state
        .permit
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let analyzer = state.analyzer.clone();
    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        job(&analyzer)
    })
    .await
        .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {e}")))?;
    Ok(result?)
}

const UPLOAD_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Medical Report Analyzer</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
      background: #fafaf9; color: #1c1917;
      min-height: 100vh; display: flex; flex-direction: column;
      align-items: center; justify-content: center; padding: 24px;
    }
    h1 { font-size: 24px; margin-bottom: 8px; }
    p { color: #78716c; font-size: 14px; margin-bottom: 24px; text-align: center; }
    form { display: flex; flex-direction: column; gap: 12px; width: 100%; max-width: 360px; }
    .btn {
      padding: 16px; border-radius: 12px; font-size: 16px; font-weight: 500;
      cursor: pointer; border: none; min-height: 56px; width: 100%;
    }
    .btn-primary { background: #4a7c59; color: white; }
    .btn-secondary { background: #e7e5e4; color: #1c1917; }
    #details { font-size: 15px; margin-top: 16px; white-space: pre-line; }
  </style>
</head>
<body>
  <h1>Medical Report Analyzer</h1>
  <p>Upload a PDF report, check the patient details, then generate the summary report.</p>
  <form id="upload" action="/analyze" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept="application/pdf" required>
    <button type="button" class="btn btn-secondary" id="preview">Show patient details</button>
    <button type="submit" class="btn btn-primary">Generate report</button>
  </form>
  <div id="details"></div>
  <script>
    document.getElementById('preview').addEventListener('click', async () => {
      const out = document.getElementById('details');
      const res = await fetch('/details', { method: 'POST', body: new FormData(document.getElementById('upload')) });
      const body = await res.json();
      out.textContent = res.ok
        ? 'Name: ' + body.patient.name + '\nAge: ' + body.patient.age
        : body.error.message;
    });
  </script>
</body>
</html>
"#;
