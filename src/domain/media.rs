//! Media payloads carried by generation requests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("invalid base64 payload for {file_name}: {source}")]
    InvalidBase64 {
        file_name: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// An image or video held both as raw bytes (for upload) and as base64 text
/// (for embedding). Both views are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    file_name: String,
    mime_type: String,
    bytes: Bytes,
    encoded: String,
}

impl MediaPayload {
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        let encoded = STANDARD.encode(&bytes);
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
            encoded,
        }
    }

    pub fn from_base64(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        encoded: &str,
    ) -> Result<Self, MediaError> {
        let file_name = file_name.into();
        // Data URIs carry a "data:<mime>;base64," prefix that is not part of the payload.
        let raw = encoded
            .split_once(";base64,")
            .map(|(_, data)| data)
            .unwrap_or(encoded)
            .trim();

        let decoded = STANDARD
            .decode(raw)
            .map_err(|source| MediaError::InvalidBase64 {
                file_name: file_name.clone(),
                source,
            })?;

        Ok(Self {
            file_name,
            mime_type: mime_type.into(),
            bytes: Bytes::from(decoded),
            encoded: raw.to_string(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn base64(&self) -> &str {
        &self.encoded
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URI suitable for inline previews.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded)
    }
}

/// Best-effort MIME type from a file name's extension.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}
