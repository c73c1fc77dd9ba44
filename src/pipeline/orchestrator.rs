use std::time::Instant;

use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extraction::ExtractionClient;
use crate::llm::LlmClient;
use crate::telemetry::metrics::{
    LAB_REPORT_DURATION, LAB_REPORT_FIELDS_POPULATED, LAB_REPORT_UNKNOWN_LABELS,
    LAB_REPORTS_PROCESSED,
};

use super::populate::populate;
use super::prompt::build_summary_prompt;
use super::schema::StructuredReport;
use super::summarize::{SummarySettings, summarize};

/// JSON body returned for every lab report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReportEnvelope {
    Success {
        patient_name: Option<String>,
        age: Option<String>,
        lab_results: StructuredReport,
        medical_summary: String,
    },
    Error {
        message: String,
    },
}

impl ReportEnvelope {
    pub fn success(lab_results: StructuredReport, medical_summary: String) -> Self {
        Self::Success {
            patient_name: lab_results.patient_information.patient_name.clone(),
            age: lab_results.patient_information.age.clone(),
            lab_results,
            medical_summary,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Extracted,
    Populated,
    Summarized,
    Returned,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Extracted => "extracted",
            Stage::Populated => "populated",
            Stage::Summarized => "summarized",
            Stage::Returned => "returned",
            Stage::Failed => "failed",
        }
    }
}

fn enter(stage: Stage) {
    tracing::Span::current().record("report.stage", stage.as_str());
    tracing::debug!(stage = stage.as_str(), "Lab report stage reached");
}

/// Extract, populate, summarize. Stages run strictly in sequence and the
/// success envelope is only built once all of them are done.
#[tracing::instrument(
    name = "pipeline lab_report",
    skip(extraction_client, llm_client, settings, image),
    fields(
        report.id = %uuid::Uuid::new_v4(),
        report.image_bytes = image.len(),
        report.stage,
        report.summary_fallback,
        report.duration_ms,
    )
)]
pub async fn process_lab_report(
    extraction_client: &ExtractionClient,
    llm_client: &LlmClient,
    settings: &SummarySettings,
    image: Vec<u8>,
) -> Result<ReportEnvelope, AppError> {
    let start = Instant::now();
    enter(Stage::Received);

    let result = run_stages(extraction_client, llm_client, settings, image).await;

    let duration = start.elapsed();
    let outcome = match &result {
        Ok(_) => {
            enter(Stage::Returned);
            "success"
        }
        Err(err) => {
            enter(Stage::Failed);
            tracing::warn!(error.kind = err.kind(), "Lab report processing failed");
            "error"
        }
    };

    LAB_REPORTS_PROCESSED.add(1, &[KeyValue::new("outcome", outcome)]);
    LAB_REPORT_DURATION.record(duration.as_secs_f64(), &[KeyValue::new("outcome", outcome)]);
    tracing::Span::current().record("report.duration_ms", duration.as_millis() as u64);

    result
}

async fn run_stages(
    extraction_client: &ExtractionClient,
    llm_client: &LlmClient,
    settings: &SummarySettings,
    image: Vec<u8>,
) -> Result<ReportEnvelope, AppError> {
    // Stage 1: Document extraction
    let document = extraction_client
        .extract(image)
        .await
        .map_err(|e| AppError::Extraction(e.to_string()))?;
    enter(Stage::Extracted);

    // Stage 2: Map entities onto the schema
    let population = populate(&document.entities);
    LAB_REPORT_FIELDS_POPULATED.record(population.report.populated_fields() as f64, &[]);
    if !population.unknown_labels.is_empty() {
        LAB_REPORT_UNKNOWN_LABELS.add(population.unknown_labels.len() as u64, &[]);
    }
    enter(Stage::Populated);

    // Stage 3: Plain-language summary, degraded to the fallback on failure
    let prompt = build_summary_prompt(&population.report, &settings.language);
    let summary = summarize(llm_client, settings, prompt).await;
    tracing::Span::current().record("report.summary_fallback", summary.is_fallback());
    enter(Stage::Summarized);

    Ok(ReportEnvelope::success(population.report, summary.into_text()))
}
