use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{Entity, ExtractRequest, ExtractedDocument, Extractor};

/// Google Document AI `processors.process` over REST.
pub struct DocumentAiExtractor {
    client: reqwest::Client,
    endpoint: String,
    processor: String,
    access_token: String,
}

impl DocumentAiExtractor {
    pub fn new(endpoint: &str, processor: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            processor: processor.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn process_url(&self) -> String {
        format!("{}/v1/{}:process", self.endpoint, self.processor)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocument,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    content: String,
    mime_type: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    document: Option<DocumentPayload>,
}

#[derive(Deserialize, Default)]
struct DocumentPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    entities: Vec<EntityPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityPayload {
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    mention_text: String,
    #[serde(default)]
    confidence: f32,
}

#[derive(Deserialize)]
struct DocumentAiError {
    error: DocumentAiErrorDetail,
}

#[derive(Deserialize)]
struct DocumentAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl Extractor for DocumentAiExtractor {
    async fn process(&self, req: &ExtractRequest) -> anyhow::Result<ExtractedDocument> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| anyhow::anyhow!("invalid access token header: {e}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = ProcessRequest {
            raw_document: RawDocument {
                content: BASE64.encode(&req.content),
                mime_type: req.mime_type.clone(),
            },
        };

        let response = self
            .client
            .post(self.process_url())
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<DocumentAiError>(&error_body) {
                return Err(anyhow::anyhow!(
                    "Document AI error ({}): {}",
                    status,
                    err.error.message
                ));
            }
            return Err(anyhow::anyhow!(
                "Document AI error ({}): {}",
                status,
                error_body
            ));
        }

        let resp: ProcessResponse = response.json().await?;
        let document = resp.document.unwrap_or_default();

        Ok(ExtractedDocument {
            text: document.text,
            entities: document
                .entities
                .into_iter()
                .map(|e| Entity {
                    label: e.entity_type,
                    value: e.mention_text,
                    confidence: e.confidence,
                })
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "document_ai"
    }
}
