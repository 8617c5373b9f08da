use crate::domain::params::{GenerationRequest, RemoteHandle};
use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;

/// A finished generation as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    pub bytes: Bytes,
    pub mime_type: String,
    pub handle: RemoteHandle,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Run one generation to completion.
    /// Failures carry only the service's message text.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedVideo, Box<dyn Error + Send + Sync>>;
}
