use async_trait::async_trait;
use std::error::Error;

/// Host capability for choosing the API credential. Optional: when the host
/// has none, every submission is allowed through.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialPort: Send + Sync {
    /// Whether a credential is currently selected
    async fn has_selected_credential(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// Let the user pick a credential
    async fn open_selector(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}
