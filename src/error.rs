use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn public_message(&self) -> &str {
        match self {
            AppError::Validation(msg) | AppError::Backend(msg) => msg,
        }
    }
}

pub(crate) fn current_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Backend(msg) = &self {
            tracing::error!(error = %msg, "Backend error");
        }

        let status = self.status_code();
        let mut body = json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        });
        if let Some(trace_id) = current_trace_id() {
            body["trace_id"] = json!(trace_id);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
