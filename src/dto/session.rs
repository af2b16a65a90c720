use serde::{Deserialize, Serialize};

use crate::services::persona::{Persona, Tone, UnknownLabel, Voice};
use crate::session::{ChatSession, Message};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub persona: Persona,
    pub messages: Vec<Message>,
    pub document_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id().to_string(),
            persona: session.persona(),
            messages: session.messages().to_vec(),
            document_count: session.documents().len(),
            created_at: session.created_at().to_rfc3339(),
            updated_at: session.updated_at().to_rfc3339(),
        }
    }
}

/// Persona selection as UI labels. Omitted axes keep the session's current
/// selection.
#[derive(Debug, Default, Deserialize)]
pub struct PersonaSelection {
    pub tone: Option<String>,
    pub voice: Option<String>,
}

impl PersonaSelection {
    pub fn resolve(&self, current: Persona) -> Result<Persona, UnknownLabel> {
        let tone = match self.tone.as_deref() {
            Some(label) => label.parse::<Tone>()?,
            None => current.tone,
        };
        let voice = match self.voice.as_deref() {
            Some(label) => label.parse::<Voice>()?,
            None => current.voice,
        };
        Ok(Persona::new(tone, voice))
    }
}

#[derive(Debug, Serialize)]
pub struct PersonaResponse {
    pub persona: Persona,
    pub selected_tone: String,
    pub selected_voice: String,
}

impl From<Persona> for PersonaResponse {
    fn from(persona: Persona) -> Self {
        Self {
            persona,
            selected_tone: format!("Selected tone: {}", persona.tone),
            selected_voice: format!("Selected voice: {}", persona.voice),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(flatten)]
    pub persona: PersonaSelection,
    /// Key typed into the UI when it is not sent as a bearer header.
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
    pub messages: Vec<Message>,
}
