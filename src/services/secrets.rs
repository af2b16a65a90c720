use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

pub const COHERE_API_KEY: &str = "COHERE_API_KEY";

/// Operator-managed secrets. Keys found here take precedence over anything a
/// user enters in the browser.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

impl SecretStore {
    /// Read a flat `KEY = "value"` TOML file. A missing file yields an empty
    /// store; `COHERE_API_KEY` falls back to the process environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut store = match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw)
                .with_context(|| format!("Failed to parse secrets file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read secrets file {}", path.display()));
            }
        };

        if store.get(COHERE_API_KEY).is_none() {
            if let Ok(value) = std::env::var(COHERE_API_KEY) {
                store.values.insert(COHERE_API_KEY.to_string(), value);
            }
        }

        Ok(store)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let values: HashMap<String, String> = toml::from_str(raw)?;
        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has_chat_key(&self) -> bool {
        self.get(COHERE_API_KEY).is_some()
    }
}

/// Pick the credential for a turn: the managed key when one is configured,
/// otherwise whatever the user entered.
pub fn resolve_credential(store: &SecretStore, entered: Option<&str>) -> Option<String> {
    store
        .get(COHERE_API_KEY)
        .or_else(|| entered.filter(|k| !k.trim().is_empty()))
        .map(|k| k.to_string())
}
