use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
};

use super::{GenerateRequest, GenerateResponse, Provider};

pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, api_base: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        Self {
            client: Client::with_config(config),
            provider_name: "openai".to_string(),
        }
    }

    /// Gemini through its OpenAI-compatible surface.
    pub fn new_google(api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base("https://generativelanguage.googleapis.com/v1beta/openai");
        Self {
            client: Client::with_config(config),
            provider_name: "google".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(req.prompt.clone()),
                name: None,
            },
        )];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages,
            temperature: Some(req.temperature),
            max_completion_tokens: Some(req.max_tokens),
            ..Default::default()
        };

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let finish_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason)
            .map(|r| format!("{r:?}").to_lowercase())
            .unwrap_or_default();

        let (input_tokens, output_tokens) = match &response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(GenerateResponse {
            content,
            model: response.model,
            input_tokens,
            output_tokens,
            finish_reason,
            provider: String::new(),
        })
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClient;
    use crate::pipeline::summarize::{Summary, SummarySettings, summarize};
    use crate::test_support::spawn_server;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "gemini-2.0-flash".to_string(),
            prompt: "Explain these results".to_string(),
            temperature: 0.3,
            max_tokens: 512,
        }
    }

    fn completion(choices: Value) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gemini-2.0-flash",
            "choices": choices,
            "usage": {"prompt_tokens": 90, "completion_tokens": 30, "total_tokens": 120}
        })
    }

    #[tokio::test]
    async fn test_generate_reads_first_choice() {
        let app = Router::new().fallback(
            |uri: Uri, headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(uri.path(), "/chat/completions");
                assert_eq!(headers["authorization"], "Bearer oa-key");
                assert_eq!(body["model"], "gemini-2.0-flash");
                assert_eq!(body["messages"][0]["role"], "user");
                assert_eq!(body["messages"][0]["content"], "Explain these results");
                Json(completion(json!([{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Your results are normal.", "refusal": null},
                    "finish_reason": "stop"
                }])))
            },
        );
        let base = spawn_server(app).await;

        let provider = OpenAIProvider::new("oa-key", Some(&base));
        let resp = provider.generate(&request()).await.unwrap();

        assert_eq!(resp.content, "Your results are normal.");
        assert_eq!(resp.model, "gemini-2.0-flash");
        assert_eq!(resp.input_tokens, 90);
        assert_eq!(resp.output_tokens, 30);
        assert_eq!(resp.finish_reason, "stop");
        assert_eq!(provider.name(), "openai");
    }

    #[tokio::test]
    async fn test_empty_choices_fall_back_to_default_summary() {
        let app = Router::new().fallback(|| async { Json(completion(json!([]))) });
        let base = spawn_server(app).await;

        let provider = OpenAIProvider::new("oa-key", Some(&base));
        let resp = provider.generate(&request()).await.unwrap();
        assert!(resp.content.is_empty());
        assert!(resp.finish_reason.is_empty());

        let client = LlmClient {
            provider: Arc::new(provider),
            provider_name: "openai".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts: 1,
        };
        let settings = SummarySettings {
            model: "gemini-2.0-flash".to_string(),
            language: "Sinhala".to_string(),
            temperature: 0.3,
            max_tokens: 512,
        };
        let summary = summarize(&client, &settings, "prompt".to_string()).await;
        assert_eq!(summary, Summary::Fallback);
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_error() {
        let app = Router::new().fallback(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": {
                        "message": "Incorrect API key provided",
                        "type": "invalid_request_error",
                        "param": null,
                        "code": "invalid_api_key"
                    }
                })),
            )
                .into_response()
        });
        let base = spawn_server(app).await;

        let provider = OpenAIProvider::new("bad", Some(&base));
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(
            err.to_string().contains("Incorrect API key provided"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_google_provider_name() {
        assert_eq!(OpenAIProvider::new_google("k").name(), "google");
    }
}
