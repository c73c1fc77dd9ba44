use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use tokio::net::TcpListener;

use crate::extraction::{Entity, ExtractRequest, ExtractedDocument, Extractor};
use crate::llm::{GenerateRequest, GenerateResponse, Provider};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub enum StubExtraction {
    Entities(Vec<Entity>),
    Fail(String),
    Panic(String),
    Hang,
}

pub struct StubExtractor {
    pub outcome: StubExtraction,
    pub calls: Arc<AtomicUsize>,
}

impl StubExtractor {
    pub fn entities(pairs: &[(&str, &str)]) -> Self {
        Self::with(StubExtraction::Entities(
            pairs.iter().map(|(l, v)| Entity::new(*l, *v)).collect(),
        ))
    }

    pub fn failing(msg: &str) -> Self {
        Self::with(StubExtraction::Fail(msg.to_string()))
    }

    pub fn with(outcome: StubExtraction) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for StubExtractor {
    async fn process(&self, _req: &ExtractRequest) -> anyhow::Result<ExtractedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            StubExtraction::Entities(entities) => Ok(ExtractedDocument {
                text: String::new(),
                entities: entities.clone(),
            }),
            StubExtraction::Fail(msg) => Err(anyhow::anyhow!("{msg}")),
            StubExtraction::Panic(msg) => panic!("{msg}"),
            StubExtraction::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub enum StubGeneration {
    Text(String),
    Fail(String),
    Hang,
}

/// Fails the first `failures` calls, then answers with `outcome`.
pub struct StubProvider {
    pub outcome: StubGeneration,
    pub failures: usize,
    pub calls: Arc<AtomicUsize>,
    pub prompts: Arc<std::sync::Mutex<Vec<String>>>,
}

impl StubProvider {
    pub fn text(text: &str) -> Self {
        Self::with(StubGeneration::Text(text.to_string()))
    }

    pub fn failing(msg: &str) -> Self {
        Self::with(StubGeneration::Fail(msg.to_string()))
    }

    pub fn with(outcome: StubGeneration) -> Self {
        Self {
            outcome,
            failures: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl Provider for StubProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(req.prompt.clone());
        if call < self.failures {
            return Err(anyhow::anyhow!("503 service unavailable"));
        }
        match &self.outcome {
            StubGeneration::Text(text) => Ok(GenerateResponse {
                content: text.clone(),
                model: req.model.clone(),
                input_tokens: 10,
                output_tokens: 20,
                finish_reason: "stop".to_string(),
                provider: String::new(),
            }),
            StubGeneration::Fail(msg) => Err(anyhow::anyhow!("{msg}")),
            StubGeneration::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}
