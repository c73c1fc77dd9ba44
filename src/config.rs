use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub document_ai_processor: String,
    pub document_ai_endpoint: String,
    pub document_ai_access_token: String,
    pub document_mime_type: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: String,
    pub llm_api_base: Option<String>,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub summary_language: String,
    pub extraction_timeout: Duration,
    pub generation_timeout: Duration,
    pub request_timeout: Duration,
    pub generation_max_attempts: u32,
    pub max_concurrent_requests: usize,
    pub max_upload_bytes: usize,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Secrets and service
    /// identifiers have no fallback value.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let document_ai_processor = required("DOCUMENT_AI_PROCESSOR")?;
        let document_ai_endpoint = match lookup("DOCUMENT_AI_ENDPOINT") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => default_document_ai_endpoint(&document_ai_processor)?,
        };

        Ok(Self {
            port: parse(&lookup, "APP_PORT", "8080")?,
            environment: or_default("APP_ENVIRONMENT", "development"),
            document_ai_processor,
            document_ai_endpoint,
            document_ai_access_token: required("DOCUMENT_AI_ACCESS_TOKEN")?,
            document_mime_type: or_default("DOCUMENT_MIME_TYPE", "image/jpeg"),
            llm_provider: or_default("LLM_PROVIDER", "gemini"),
            llm_model: required("LLM_MODEL")?,
            llm_api_key: required("LLM_API_KEY")?,
            llm_api_base: lookup("LLM_API_BASE"),
            llm_temperature: parse(&lookup, "LLM_TEMPERATURE", "0.3")?,
            llm_max_tokens: parse(&lookup, "LLM_MAX_TOKENS", "1024")?,
            summary_language: or_default("SUMMARY_LANGUAGE", "Sinhala"),
            extraction_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "EXTRACTION_TIMEOUT_SECS",
                "30",
            )?),
            generation_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                "30",
            )?),
            request_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                "90",
            )?),
            generation_max_attempts: parse_positive(&lookup, "GENERATION_MAX_ATTEMPTS", "1")?,
            max_concurrent_requests: parse_positive(&lookup, "MAX_CONCURRENT_REQUESTS", "32")?,
            max_upload_bytes: parse_positive(
                &lookup,
                "MAX_UPLOAD_BYTES",
                &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
            )?,
            otel_service_name: or_default("OTEL_SERVICE_NAME", "lab-report-summarizer"),
            otel_exporter_endpoint: or_default(
                "OTEL_EXPORTER_OTLP_ENDPOINT",
                "http://localhost:4317",
            ),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number"))
}

/// Like `parse`, but zero is rejected. Used for timeouts, limits and attempt counts.
fn parse_positive<T, F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr + PartialOrd + From<u8>,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    let value: T = parse(lookup, key, default)?;
    if value < T::from(1) {
        return Err(anyhow!("{key} must be at least 1"));
    }
    Ok(value)
}

/// `projects/<p>/locations/<loc>/processors/<id>` lives behind a regional host.
fn default_document_ai_endpoint(processor: &str) -> anyhow::Result<String> {
    let segments: Vec<&str> = processor.split('/').collect();
    match segments.as_slice() {
        ["projects", _, "locations", location, "processors", _, ..] if !location.is_empty() => {
            Ok(format!("https://{location}-documentai.googleapis.com"))
        }
        _ => Err(anyhow!(
            "DOCUMENT_AI_PROCESSOR must look like projects/<project>/locations/<location>/processors/<id>"
        )),
    }
}
