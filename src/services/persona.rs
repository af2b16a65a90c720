use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Unknown {axis} '{label}'")]
pub struct UnknownLabel {
    pub axis: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Default,
    Formal,
    #[serde(rename = "Semi-formal")]
    SemiFormal,
    Casual,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Default, Tone::Formal, Tone::SemiFormal, Tone::Casual];

    pub fn label(self) -> &'static str {
        match self {
            Tone::Default => "Default",
            Tone::Formal => "Formal",
            Tone::SemiFormal => "Semi-formal",
            Tone::Casual => "Casual",
        }
    }
}

impl FromStr for Tone {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| UnknownLabel {
                axis: "tone",
                label: s.to_string(),
            })
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voice {
    #[default]
    Default,
    Humorous,
    Informative,
    Authoritative,
    Conversational,
    Pleading,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Default,
        Voice::Humorous,
        Voice::Informative,
        Voice::Authoritative,
        Voice::Conversational,
        Voice::Pleading,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Voice::Default => "Default",
            Voice::Humorous => "Humorous",
            Voice::Informative => "Informative",
            Voice::Authoritative => "Authoritative",
            Voice::Conversational => "Conversational",
            Voice::Pleading => "Pleading",
        }
    }
}

impl FromStr for Voice {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|v| v.label() == s)
            .ok_or_else(|| UnknownLabel {
                axis: "voice",
                label: s.to_string(),
            })
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tone and voice selected for the next turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub tone: Tone,
    pub voice: Voice,
}

impl Persona {
    pub fn new(tone: Tone, voice: Voice) -> Self {
        Self { tone, voice }
    }

    /// Parse both axes from UI labels.
    pub fn from_labels(tone: &str, voice: &str) -> Result<Self, UnknownLabel> {
        Ok(Self {
            tone: tone.parse()?,
            voice: voice.parse()?,
        })
    }
}

/// Append the persona directive to the raw user text.
pub fn decorate(user_text: &str, persona: Persona) -> String {
    format!(
        "{user_text}               ;Respond in the following tone: {}, voice: {}",
        persona.tone, persona.voice
    )
}
