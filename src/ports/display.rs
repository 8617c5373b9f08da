use crate::domain::workflow::DisplayRef;
use std::error::Error;

/// Turns raw video bytes into something a result surface can render.
#[cfg_attr(test, mockall::automock)]
pub trait DisplayPort: Send + Sync {
    /// Register bytes for display
    fn publish(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<DisplayRef, Box<dyn Error + Send + Sync>>;

    /// Invalidate a reference returned by `publish`
    fn release(&self, display: &DisplayRef);
}
