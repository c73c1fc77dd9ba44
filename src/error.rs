use std::any::Any;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::pipeline::ReportEnvelope;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Upload(_) => "upload",
            AppError::Extraction(_) => "extraction",
            AppError::Generation(_) => "generation",
            AppError::Internal(_) => "internal",
        }
    }
}

fn get_trace_id() -> Option<String> {
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

// Failures keep HTTP 200; callers branch on the envelope's `status` field.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = get_trace_id().unwrap_or_default();
        match &self {
            AppError::Upload(msg) => {
                tracing::warn!(
                    error.kind = self.kind(),
                    error = %msg,
                    %trace_id,
                    "Upload rejected"
                );
            }
            AppError::Extraction(msg) | AppError::Generation(msg) | AppError::Internal(msg) => {
                tracing::error!(
                    error.kind = self.kind(),
                    error = %msg,
                    %trace_id,
                    "Request failed"
                );
            }
        }

        Json(ReportEnvelope::error(self.to_string())).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Renders a panic raised while serving a request as an `Internal` envelope.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "request handler panicked".to_string()
    };

    AppError::Internal(detail).into_response()
}
