use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::{ReportEnvelope, process_lab_report};

const FILE_FIELD: &str = "file";

pub async fn create_lab_report(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ReportEnvelope>> {
    let multipart = multipart.map_err(|e| AppError::Upload(e.body_text()))?;
    let image = read_upload(multipart).await?;

    let envelope = process_lab_report(
        &state.extraction_client,
        &state.llm_client,
        &state.summary_settings,
        image,
    )
    .await?;

    Ok(Json(envelope))
}

async fn read_upload(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            AppError::Upload(format!("failed to read {filename}: {}", e.body_text()))
        })?;

        if bytes.is_empty() {
            return Err(AppError::Upload(format!("{filename} is empty")));
        }

        tracing::info!(
            file.name = %filename,
            file.size_bytes = bytes.len(),
            "Lab report uploaded"
        );
        return Ok(bytes.to_vec());
    }

    Err(AppError::Upload(format!(
        "missing multipart field `{FILE_FIELD}`"
    )))
}
