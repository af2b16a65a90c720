use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::dto::session::{
    PersonaResponse, PersonaSelection, SendMessageRequest, SendMessageResponse, SessionResponse,
};
use crate::errors::AppError;
use crate::middleware::credential::EnteredCredential;
use crate::services::secrets::resolve_credential;
use crate::state::AppState;

// ── Sessions ────────────────────────────────────────────────

pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionResponse::from(&session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    let response = handle.read(|session| SessionResponse::from(session)).await;
    Ok(Json(response))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Persona ─────────────────────────────────────────────────

pub async fn update_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PersonaSelection>,
) -> Result<Json<PersonaResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    let persona = handle
        .update(|session| {
            let persona = payload.resolve(session.persona())?;
            session.set_persona(persona);
            Ok::<_, AppError>(persona)
        })
        .await?;
    Ok(Json(persona.into()))
}

// ── Send Message ────────────────────────────────────────────

pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    EnteredCredential(header_key): EnteredCredential,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    if payload.message.trim().is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    let handle = state.sessions.get(&id).await?;
    let persona = payload
        .persona
        .resolve(handle.read(|session| session.persona()).await)?;

    let entered = header_key.or(payload.api_key);
    let credential = resolve_credential(&state.secrets, entered.as_deref());

    // A second submission while this one is in flight gets SessionBusy.
    let reply = handle
        .submit(
            state.chat.as_ref(),
            &payload.message,
            persona,
            credential.as_deref(),
            state.config.features.document_grounding,
        )
        .await?;

    Ok(Json(SendMessageResponse {
        reply,
        messages: handle.read(|session| session.messages().to_vec()).await,
    }))
}
