pub mod client;
pub mod document_ai;

pub use client::ExtractionClient;

/// A labelled value recognized on the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub label: String,
    pub value: String,
    pub confidence: f32,
}

impl Entity {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            confidence: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub content: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub text: String,
    pub entities: Vec<Entity>,
}

#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn process(&self, req: &ExtractRequest) -> anyhow::Result<ExtractedDocument>;
    fn name(&self) -> &str;
}
