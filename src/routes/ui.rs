use axum::{extract::State, Json};
use serde::Serialize;

use crate::services::persona::{Tone, Voice};
use crate::services::prompt::{GREETING, PAGE_TITLE};
use crate::state::AppState;

pub const API_KEY_URL: &str = "https://dashboard.cohere.ai/api-keys";

/// Everything the browser needs to lay out the page and sidebar.
#[derive(Serialize)]
pub struct UiResponse {
    pub title: &'static str,
    pub greeting: &'static str,
    pub tones: Vec<&'static str>,
    pub voices: Vec<&'static str>,
    /// False when an operator-managed key is configured.
    pub credential_required: bool,
    pub credential_label: &'static str,
    pub api_key_url: &'static str,
    pub document_upload_enabled: bool,
}

pub async fn get_ui(State(state): State<AppState>) -> Json<UiResponse> {
    Json(UiResponse {
        title: PAGE_TITLE,
        greeting: GREETING,
        tones: Tone::ALL.iter().map(|t| t.label()).collect(),
        voices: Voice::ALL.iter().map(|v| v.label()).collect(),
        credential_required: !state.secrets.has_chat_key(),
        credential_label: "Cohere API Key",
        api_key_url: API_KEY_URL,
        document_upload_enabled: state.config.features.document_upload_enabled,
    })
}
