use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tracing::Instrument;

use super::{ExtractRequest, ExtractedDocument, Extractor};
use crate::telemetry::classify_error;
use crate::telemetry::metrics::{
    DOCUMENT_AI_DURATION, DOCUMENT_AI_ENTITY_COUNT, DOCUMENT_AI_ERROR_COUNT,
};

pub struct ExtractionClient {
    pub extractor: Arc<dyn Extractor>,
    pub processor: String,
    pub mime_type: String,
    pub timeout: Duration,
}

impl ExtractionClient {
    pub async fn extract(&self, content: Vec<u8>) -> anyhow::Result<ExtractedDocument> {
        let req = ExtractRequest {
            content,
            mime_type: self.mime_type.clone(),
        };
        let extractor_name = self.extractor.name().to_string();
        let start = Instant::now();

        let span = tracing::info_span!(
            "document_ai.process",
            otel.name = "document_ai.process",
            extractor.name = %extractor_name,
            document_ai.processor = %self.processor,
            document.mime_type = %req.mime_type,
            document.size_bytes = req.content.len() as i64,
            document.text_length = tracing::field::Empty,
            document.entities = tracing::field::Empty,
            document.mean_confidence = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        let result = tokio::time::timeout(self.timeout, self.extractor.process(&req))
            .instrument(span.clone())
            .await
            .unwrap_or_else(|_| {
                Err(anyhow::anyhow!(
                    "document extraction timed out after {}s",
                    self.timeout.as_secs()
                ))
            });

        let duration = start.elapsed().as_secs_f64();
        let extractor_kv = KeyValue::new("extractor.name", extractor_name);

        match result {
            Ok(doc) => {
                span.record("document.text_length", doc.text.len() as i64);
                span.record("document.entities", doc.entities.len() as i64);
                if !doc.entities.is_empty() {
                    let total: f32 = doc.entities.iter().map(|e| e.confidence).sum();
                    span.record(
                        "document.mean_confidence",
                        f64::from(total / doc.entities.len() as f32),
                    );
                }

                DOCUMENT_AI_DURATION.record(duration, &[extractor_kv.clone()]);
                DOCUMENT_AI_ENTITY_COUNT.record(doc.entities.len() as f64, &[extractor_kv]);

                tracing::debug!(
                    parent: &span,
                    entities = doc.entities.len(),
                    duration_s = duration,
                    "Document extracted"
                );
                Ok(doc)
            }
            Err(err) => {
                let error_type = classify_error(&err);
                span.record("otel.status_code", "ERROR");
                span.record("error.type", error_type);

                DOCUMENT_AI_ERROR_COUNT.add(
                    1,
                    &[extractor_kv, KeyValue::new("error.type", error_type)],
                );
                Err(err)
            }
        }
    }
}
