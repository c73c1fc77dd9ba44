use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{GenerateRequest, GenerateResponse, Provider};
use crate::telemetry::classify_error;
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_RETRY_COUNT, GEN_AI_TOKEN_USAGE,
};

/// One long-lived provider handle shared by every request.
pub struct LlmClient {
    pub provider: Arc<dyn Provider>,
    pub provider_name: String,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl LlmClient {
    pub async fn generate_once(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let provider_name = self.provider_name.as_str();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %server_address(provider_name),
            gen_ai.request.temperature = req.temperature,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "gen_ai.user.message",
            vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))],
        );

        let result = tokio::time::timeout(self.timeout, self.provider.generate(req))
            .instrument(span.clone())
            .await
            .unwrap_or_else(|_| {
                Err(anyhow::anyhow!(
                    "generation timed out after {}s",
                    self.timeout.as_secs()
                ))
            });

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(mut resp) => {
                resp.provider = provider_name.to_string();

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
                let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name.to_string());
                let model_kv = KeyValue::new("gen_ai.request.model", resp.model.clone());

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", classify_error(&err));

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name.to_string()),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                    ],
                );

                Err(err)
            }
        }
    }

    /// Runs up to `max_attempts` calls with capped exponential backoff between them.
    pub async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let max_attempts = self.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 0..max_attempts {
            match self.generate_once(req).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        provider = %self.provider_name,
                        model = %req.model,
                        error = %err,
                        "LLM call failed"
                    );

                    if attempt > 0 {
                        GEN_AI_RETRY_COUNT.add(
                            1,
                            &[
                                KeyValue::new("gen_ai.provider.name", self.provider_name.clone()),
                                KeyValue::new("gen_ai.request.model", req.model.clone()),
                            ],
                        );
                    }

                    last_err = Some(err);

                    if attempt < max_attempts - 1 {
                        let base = backoff_base(attempt);
                        let jitter_ms = fastrand::u64(0..=base.as_millis() as u64 / 4);
                        tokio::time::sleep(base + Duration::from_millis(jitter_ms)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("all attempts exhausted")))
    }
}

/// 1s, 2s, 4s, 8s, then flat at 10s.
fn backoff_base(attempt: u32) -> Duration {
    let exp = Duration::from_secs(1) * 2u32.pow(attempt.min(4));
    exp.min(Duration::from_secs(10))
}

fn server_address(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" | "google" => "generativelanguage.googleapis.com",
        "openai" => "api.openai.com",
        _ => "unknown",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubGeneration, StubProvider};
    use std::sync::atomic::Ordering;

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "gemini-2.0-flash".to_string(),
            prompt: "summarize".to_string(),
            temperature: 0.3,
            max_tokens: 256,
        }
    }

    fn client(provider: StubProvider, max_attempts: u32) -> LlmClient {
        LlmClient {
            provider: Arc::new(provider),
            provider_name: "gemini".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_generate_tags_provider() {
        let client = client(StubProvider::text("all good"), 1);
        let resp = client.generate(&request()).await.unwrap();
        assert_eq!(resp.content, "all good");
        assert_eq!(resp.provider, "gemini");
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let stub = StubProvider::failing("503 service unavailable");
        let calls = stub.calls.clone();
        let client = client(stub, 1);

        assert!(client.generate(&request()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let mut stub = StubProvider::text("recovered");
        stub.failures = 2;
        let calls = stub.calls.clone();
        let client = client(stub, 3);

        let resp = client.generate(&request()).await.unwrap();
        assert_eq!(resp.content, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_times_out() {
        let client = LlmClient {
            timeout: Duration::from_secs(2),
            ..client(StubProvider::with(StubGeneration::Hang), 1)
        };
        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "generation timed out after 2s");
        assert_eq!(classify_error(&err), "timeout");
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_base(0), Duration::from_secs(1));
        assert_eq!(backoff_base(3), Duration::from_secs(8));
        assert_eq!(backoff_base(4), Duration::from_secs(10));
        assert_eq!(backoff_base(32), Duration::from_secs(10));
        assert_eq!(backoff_base(u32::MAX - 1), Duration::from_secs(10));
    }

    #[test]
    fn test_server_address() {
        assert_eq!(server_address("gemini"), "generativelanguage.googleapis.com");
        assert_eq!(server_address("google"), "generativelanguage.googleapis.com");
        assert_eq!(server_address("openai"), "api.openai.com");
        assert_eq!(server_address("other"), "unknown");
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("hé世界!", 3);
        assert_eq!(result, "hé");
    }
}
