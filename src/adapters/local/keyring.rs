//! API key selection for hosts without a platform key picker.
//!
//! The key lives in a shared slot: the generation client reads it on every
//! call, and the selector below overwrites it from a terminal prompt.

use crate::ports::credentials::CredentialPort;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Default)]
pub struct ApiKey {
    slot: Arc<RwLock<Option<String>>>,
}

impl ApiKey {
    pub fn new(initial: Option<String>) -> Self {
        let key = Self::default();
        if let Some(value) = initial {
            key.set(value);
        }
        key
    }

    pub fn get(&self) -> Option<String> {
        self.slot.read().clone()
    }

    /// Blank input clears the slot.
    pub fn set(&self, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        *self.slot.write() = (!value.is_empty()).then_some(value);
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().is_some()
    }
}

// Never print the key itself
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("set", &self.is_set())
            .finish()
    }
}

pub struct PromptCredentials {
    key: ApiKey,
    prompt: String,
}

impl PromptCredentials {
    pub fn new(key: ApiKey) -> Self {
        Self {
            key,
            prompt: "Gemini API key (from a paid Google Cloud project): ".to_string(),
        }
    }
}

#[async_trait]
impl CredentialPort for PromptCredentials {
    async fn has_selected_credential(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.key.is_set())
    }

    async fn open_selector(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let prompt = self.prompt.clone();
        let entered =
            tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt)).await??;

        self.key.set(entered);
        if !self.key.is_set() {
            return Err("no API key entered".into());
        }
        info!("API key selected");
        Ok(())
    }
}
