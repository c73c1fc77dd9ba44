use crate::error::AppError;
use crate::llm::{GenerateRequest, LlmClient};
use crate::telemetry::metrics::LAB_REPORT_SUMMARY_FALLBACKS;
use opentelemetry::KeyValue;

pub const FALLBACK_SUMMARY: &str = "Summary not generated.";

#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub model: String,
    pub language: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Generated(String),
    Fallback,
}

impl Summary {
    pub fn into_text(self) -> String {
        match self {
            Summary::Generated(text) => text,
            Summary::Fallback => FALLBACK_SUMMARY.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Summary::Fallback)
    }
}

async fn request_summary(
    llm_client: &LlmClient,
    settings: &SummarySettings,
    prompt: String,
) -> Result<String, AppError> {
    let resp = llm_client
        .generate(&GenerateRequest {
            model: settings.model.clone(),
            prompt,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
        .await
        .map_err(|e| AppError::Generation(e.to_string()))?;

    if resp.content.trim().is_empty() {
        return Err(AppError::Generation(format!(
            "empty response (finish_reason={})",
            resp.finish_reason
        )));
    }
    Ok(resp.content)
}

/// Generation problems never fail the request; they degrade to the fallback summary.
#[tracing::instrument(
    name = "pipeline_stage summarize",
    skip(llm_client, settings, prompt),
    fields(
        pipeline.stage = "summarize",
        summary.fallback,
        summary.length,
    )
)]
pub async fn summarize(
    llm_client: &LlmClient,
    settings: &SummarySettings,
    prompt: String,
) -> Summary {
    let span = tracing::Span::current();

    match request_summary(llm_client, settings, prompt).await {
        Ok(text) => {
            span.record("summary.fallback", false);
            span.record("summary.length", text.len());
            Summary::Generated(text)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Falling back to default summary");
            span.record("summary.fallback", true);
            LAB_REPORT_SUMMARY_FALLBACKS.add(1, &[KeyValue::new("error.kind", err.kind())]);
            Summary::Fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn settings() -> SummarySettings {
        SummarySettings {
            model: "gemini-2.0-flash".to_string(),
            language: "Sinhala".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
        }
    }

    fn client(provider: StubProvider) -> LlmClient {
        LlmClient {
            provider: Arc::new(provider),
            provider_name: "gemini".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_summarize_returns_generated_text() {
        let summary = summarize(
            &client(StubProvider::text("Your results look healthy.")),
            &settings(),
            "prompt".to_string(),
        )
        .await;
        assert_eq!(summary, Summary::Generated("Your results look healthy.".to_string()));
    }

    #[tokio::test]
    async fn test_summarize_error_falls_back() {
        let summary = summarize(
            &client(StubProvider::failing("API key not valid")),
            &settings(),
            "prompt".to_string(),
        )
        .await;
        assert!(summary.is_fallback());
        assert_eq!(summary.into_text(), "Summary not generated.");
    }

    #[tokio::test]
    async fn test_summarize_blank_text_falls_back() {
        let summary = summarize(
            &client(StubProvider::text("  \n")),
            &settings(),
            "prompt".to_string(),
        )
        .await;
        assert_eq!(summary, Summary::Fallback);
    }

    #[test]
    fn test_summarize_blocking_runtime() {
        let stub = StubProvider::text("ok");
        let prompts = stub.prompts.clone();
        let summary = tokio_test::block_on(summarize(
            &client(stub),
            &settings(),
            "exact prompt".to_string(),
        ));
        assert_eq!(summary.into_text(), "ok");
        assert_eq!(*prompts.lock().unwrap(), vec!["exact prompt".to_string()]);
    }
}
