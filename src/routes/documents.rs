use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use crate::dto::document::DocumentUploadResponse;
use crate::errors::AppError;
use crate::services::pdf::{self, Snippet};
use crate::state::AppState;

pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, AppError> {
    if !state.config.features.document_upload_enabled {
        return Err(AppError::FeatureDisabled("Document upload".to_string()));
    }

    // Fail fast on unknown sessions before reading the body.
    let handle = state.sessions.get(&id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let filename = field.file_name().unwrap_or("unnamed.pdf").to_string();
    let content_type = field.content_type().unwrap_or("application/pdf").to_string();

    let is_pdf = content_type == "application/pdf"
        || (content_type == "application/octet-stream" && filename.to_lowercase().ends_with(".pdf"));
    if !is_pdf {
        return Err(AppError::Validation("Only PDF files are supported".to_string()));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;

    let max_bytes = state.config.documents.max_upload_bytes;
    if data.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "File too large. Maximum size is {} MB",
            max_bytes / 1024 / 1024
        )));
    }

    tracing::info!("Chunking '{filename}' ({} bytes) for session {id}", data.len());

    let chunk_size = state.config.documents.chunk_size;
    let snippets = tokio::task::spawn_blocking(move || pdf::chunk_pdf_bytes(&data, chunk_size))
        .await
        .context("PDF chunking task panicked")??;

    let response = DocumentUploadResponse::new(filename, &snippets);

    handle.update(|session| session.replace_documents(snippets)).await;

    Ok(Json(response))
}

pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Snippet>>, AppError> {
    let handle = state.sessions.get(&id).await?;
    let documents = handle.read(|session| session.documents().to_vec()).await;
    Ok(Json(documents))
}
