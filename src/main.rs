use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get, post};
use opentelemetry::KeyValue;
use tokio::net::TcpListener;
use tokio::signal;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

mod config;
mod error;
mod extraction;
mod llm;
mod pipeline;
mod routes;
mod telemetry;
#[cfg(test)]
mod test_support;

use config::Config;
use extraction::{ExtractionClient, Extractor, document_ai::DocumentAiExtractor};
use llm::{LlmClient, Provider};
use pipeline::SummarySettings;
use telemetry::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL, init_telemetry};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub extraction_client: Arc<ExtractionClient>,
    pub llm_client: Arc<LlmClient>,
    pub summary_settings: SummarySettings,
}

impl AppState {
    /// Wraps the long-lived collaborator handles; nothing here is mutated per request.
    pub fn new(
        config: Config,
        extractor: Arc<dyn Extractor>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let extraction_client = Arc::new(ExtractionClient {
            extractor,
            processor: config.document_ai_processor.clone(),
            mime_type: config.document_mime_type.clone(),
            timeout: config.extraction_timeout,
        });

        let provider_name = provider.name().to_string();
        let llm_client = Arc::new(LlmClient {
            provider,
            provider_name,
            timeout: config.generation_timeout,
            max_attempts: config.generation_max_attempts,
        });

        let summary_settings = SummarySettings {
            model: config.llm_model.clone(),
            language: config.summary_language.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        };

        Self {
            config,
            extraction_client,
            llm_client,
            summary_settings,
        }
    }
}

#[derive(Clone)]
struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let method = request.method().as_str();
        let path = request.uri().path();

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{} {}", method, path),
            http.method = %method,
            http.route = %path,
            http.target = %request.uri(),
            http.scheme = "http",
            http.flavor = ?request.version(),
            http.user_agent = request.headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();

        span.record("http.response.status_code", status as i64);

        if status >= 500 {
            span.record("otel.status_code", "ERROR");
        } else {
            span.record("otel.status_code", "OK");
        }

        let latency_ms = latency.as_secs_f64() * 1000.0;
        let status_class = format!("{}xx", status / 100);

        HTTP_REQUESTS_TOTAL.add(
            1,
            &[
                KeyValue::new("http.status_code", status.to_string()),
                KeyValue::new("http.status_class", status_class.clone()),
            ],
        );

        HTTP_REQUEST_DURATION.record(
            latency_ms,
            &[
                KeyValue::new("http.status_code", status.to_string()),
                KeyValue::new("http.status_class", status_class),
            ],
        );

        tracing::info!(
            http.response.status_code = status,
            latency_ms = latency_ms,
            "finished processing request"
        );
    }
}

pub fn app(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let request_timeout = state.config.request_timeout;
    let max_concurrent_requests = state.config.max_concurrent_requests;

    Router::new()
        .route("/api/health", get(routes::health::health))
        .route(
            "/process_lab_report/",
            post(routes::lab_reports::create_lab_report),
        )
        .route(
            "/api/lab-reports",
            post(routes::lab_reports::create_lab_report),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn Provider>> {
    let base = config.llm_api_base.as_deref();
    let provider: Arc<dyn Provider> = match config.llm_provider.as_str() {
        "gemini" => Arc::new(match base {
            Some(base) => llm::gemini::GeminiProvider::with_base(&config.llm_api_key, base),
            None => llm::gemini::GeminiProvider::new(&config.llm_api_key),
        }),
        "openai" => Arc::new(llm::openai::OpenAIProvider::new(&config.llm_api_key, base)),
        "openai-google" => Arc::new(llm::openai::OpenAIProvider::new_google(
            &config.llm_api_key,
        )),
        other => anyhow::bail!("unsupported LLM_PROVIDER {other:?}"),
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting lab-report-summarizer"
    );

    let extractor: Arc<dyn Extractor> = Arc::new(DocumentAiExtractor::new(
        &config.document_ai_endpoint,
        &config.document_ai_processor,
        &config.document_ai_access_token,
    ));
    let provider = build_provider(&config)?;

    tracing::info!(
        processor = %config.document_ai_processor,
        llm_provider = %config.llm_provider,
        llm_model = %config.llm_model,
        summary_language = %config.summary_language,
        schema_fields = pipeline::schema::StructuredReport::labels().count(),
        "External service clients initialized"
    );

    let state = AppState::new(config.clone(), extractor, provider);
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
