//! Moves a produced video back into the shape a follow-up request expects.

use crate::domain::media::{mime_for, MediaError, MediaPayload};
use crate::domain::params::{
    ExtendInput, GenerationMode, GenerationRequest, RequestBuilder, Resolution,
};
use crate::domain::workflow::GenerationOutcome;

/// File name given to a generated video when it becomes an extend input.
pub const EXTEND_SOURCE_NAME: &str = "last_video.mp4";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("generated video has no content")]
    EmptyVideo,

    #[error("generated video has no remote handle")]
    MissingHandle,

    #[error("prior request used {0:?}, which cannot be extended")]
    NotExtendable(Resolution),

    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Repackage an outcome's bytes and handle as extend-mode input media.
pub fn to_input_media(outcome: &GenerationOutcome) -> Result<ExtendInput, BridgeError> {
    if outcome.bytes.is_empty() {
        return Err(BridgeError::EmptyVideo);
    }
    if outcome.handle.is_empty() {
        return Err(BridgeError::MissingHandle);
    }

    let mime_type = if outcome.mime_type.is_empty() {
        mime_for(EXTEND_SOURCE_NAME).to_string()
    } else {
        outcome.mime_type.clone()
    };

    Ok(ExtendInput {
        video: MediaPayload::from_bytes(EXTEND_SOURCE_NAME, mime_type, outcome.bytes.clone()),
        handle: outcome.handle.clone(),
    })
}

/// Materialize embedded base64 data as a media payload.
pub fn decode(encoded: &str, file_name: &str) -> Result<MediaPayload, BridgeError> {
    Ok(MediaPayload::from_base64(
        file_name,
        mime_for(file_name),
        encoded,
    )?)
}

/// Form state for extending `outcome`: model and aspect ratio carry over,
/// the prompt starts blank, and the only media is the prior video.
pub fn extend_form(
    prior: &GenerationRequest,
    outcome: &GenerationOutcome,
) -> Result<RequestBuilder, BridgeError> {
    if !prior.resolution().is_extend_capable() {
        return Err(BridgeError::NotExtendable(prior.resolution()));
    }
    let input = to_input_media(outcome)?;

    Ok(prior
        .to_builder()
        .mode(GenerationMode::ExtendVideo)
        .prompt("")
        .input_video(input))
}
