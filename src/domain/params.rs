//! Generation request parameters.
//!
//! A `GenerationRequest` stores its media as a per-mode enum, so a request can
//! only ever carry the payloads its mode uses. `RequestBuilder` is the editable
//! form state: it keeps flat optional slots and drops the irrelevant ones when
//! the mode changes or the request is built.

use crate::domain::media::MediaPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The service accepts at most this many reference images.
pub const MAX_REFERENCE_IMAGES: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("{mode} requires {what}")]
    MissingMedia {
        mode: GenerationMode,
        what: &'static str,
    },

    #[error("at most 3 reference images are supported, got {0}")]
    TooManyReferences(usize),

    #[error("unknown {kind}: {value}")]
    Unknown { kind: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VeoModel {
    #[default]
    #[serde(rename = "veo-3.1-generate-preview")]
    Veo,
    #[serde(rename = "veo-3.1-fast-generate-preview")]
    VeoFast,
}

impl VeoModel {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Veo => "veo-3.1-generate-preview",
            Self::VeoFast => "veo-3.1-fast-generate-preview",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// The only tier whose outputs the service accepts for extension.
    pub const EXTEND_CAPABLE: Resolution = Resolution::P720;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }

    pub fn is_extend_capable(&self) -> bool {
        *self == Self::EXTEND_CAPABLE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMode {
    #[default]
    TextToVideo,
    ImageToVideo,
    ReferencesToVideo,
    Interpolation,
    ExtendVideo,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextToVideo => write!(f, "text-to-video"),
            Self::ImageToVideo => write!(f, "image-to-video"),
            Self::ReferencesToVideo => write!(f, "references-to-video"),
            Self::Interpolation => write!(f, "interpolation"),
            Self::ExtendVideo => write!(f, "extend-video"),
        }
    }
}

impl FromStr for GenerationMode {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "text-to-video" => Ok(Self::TextToVideo),
            "image" | "image-to-video" => Ok(Self::ImageToVideo),
            "references" | "references-to-video" => Ok(Self::ReferencesToVideo),
            "frames" | "interpolation" => Ok(Self::Interpolation),
            "extend" | "extend-video" => Ok(Self::ExtendVideo),
            _ => Err(ParamsError::Unknown {
                kind: "mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for VeoModel {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "veo" | "veo-3.1-generate-preview" => Ok(Self::Veo),
            "veo-fast" | "veo-3.1-fast-generate-preview" => Ok(Self::VeoFast),
            _ => Err(ParamsError::Unknown {
                kind: "model",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" | "landscape" => Ok(Self::Landscape),
            "9:16" | "portrait" => Ok(Self::Portrait),
            _ => Err(ParamsError::Unknown {
                kind: "aspect ratio",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Resolution {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" | "720" => Ok(Self::P720),
            "1080p" | "1080" => Ok(Self::P1080),
            _ => Err(ParamsError::Unknown {
                kind: "resolution",
                value: s.to_string(),
            }),
        }
    }
}

/// Identifier of a produced asset inside the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteHandle(pub String);

impl RemoteHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A previously generated video offered as input to an extend request.
/// The bytes are for preview; the service only accepts the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendInput {
    pub video: MediaPayload,
    pub handle: RemoteHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeMedia {
    TextToVideo,
    ImageToVideo {
        start_frame: MediaPayload,
    },
    ReferencesToVideo {
        references: Vec<MediaPayload>,
        style: Option<MediaPayload>,
    },
    Interpolation {
        start_frame: MediaPayload,
        end_frame: Option<MediaPayload>,
        looping: bool,
    },
    ExtendVideo(ExtendInput),
}

impl ModeMedia {
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::TextToVideo => GenerationMode::TextToVideo,
            Self::ImageToVideo { .. } => GenerationMode::ImageToVideo,
            Self::ReferencesToVideo { .. } => GenerationMode::ReferencesToVideo,
            Self::Interpolation { .. } => GenerationMode::Interpolation,
            Self::ExtendVideo(_) => GenerationMode::ExtendVideo,
        }
    }
}

/// One generation attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    model: VeoModel,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    media: ModeMedia,
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> VeoModel {
        self.model
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn mode(&self) -> GenerationMode {
        self.media.mode()
    }

    pub fn media(&self) -> &ModeMedia {
        &self.media
    }

    pub fn reference_images(&self) -> &[MediaPayload] {
        match &self.media {
            ModeMedia::ReferencesToVideo { references, .. } => references,
            _ => &[],
        }
    }

    pub fn style_image(&self) -> Option<&MediaPayload> {
        match &self.media {
            ModeMedia::ReferencesToVideo { style, .. } => style.as_ref(),
            _ => None,
        }
    }

    pub fn start_frame(&self) -> Option<&MediaPayload> {
        match &self.media {
            ModeMedia::ImageToVideo { start_frame } => Some(start_frame),
            ModeMedia::Interpolation { start_frame, .. } => Some(start_frame),
            _ => None,
        }
    }

    pub fn end_frame(&self) -> Option<&MediaPayload> {
        match &self.media {
            ModeMedia::Interpolation { end_frame, .. } => end_frame.as_ref(),
            _ => None,
        }
    }

    pub fn is_looping(&self) -> bool {
        matches!(self.media, ModeMedia::Interpolation { looping: true, .. })
    }

    pub fn input_video(&self) -> Option<&ExtendInput> {
        match &self.media {
            ModeMedia::ExtendVideo(input) => Some(input),
            _ => None,
        }
    }

    /// Form state that reproduces this request, for edit-and-resubmit.
    pub fn to_builder(&self) -> RequestBuilder {
        RequestBuilder {
            prompt: self.prompt.clone(),
            model: self.model,
            aspect_ratio: self.aspect_ratio,
            resolution: self.resolution,
            mode: self.mode(),
            reference_images: self.reference_images().to_vec(),
            style_image: self.style_image().cloned(),
            start_frame: self.start_frame().cloned(),
            end_frame: self.end_frame().cloned(),
            looping: self.is_looping(),
            input_video: self.input_video().cloned(),
        }
    }
}

/// Editable form values. Slots not used by `mode` are dropped by
/// [`RequestBuilder::mode`] and ignored by [`RequestBuilder::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBuilder {
    pub prompt: String,
    pub model: VeoModel,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub mode: GenerationMode,
    pub reference_images: Vec<MediaPayload>,
    pub style_image: Option<MediaPayload>,
    pub start_frame: Option<MediaPayload>,
    pub end_frame: Option<MediaPayload>,
    pub looping: bool,
    pub input_video: Option<ExtendInput>,
}

impl RequestBuilder {
    pub fn new(mode: GenerationMode) -> Self {
        Self::default().mode(mode)
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    pub fn aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Switches mode and clears every media slot the new mode does not use.
    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        let uses_start = matches!(
            mode,
            GenerationMode::ImageToVideo | GenerationMode::Interpolation
        );
        if !uses_start {
            self.start_frame = None;
        }
        if mode != GenerationMode::Interpolation {
            self.end_frame = None;
            self.looping = false;
        }
        if mode != GenerationMode::ReferencesToVideo {
            self.reference_images.clear();
            self.style_image = None;
        }
        if mode != GenerationMode::ExtendVideo {
            self.input_video = None;
        } else {
            self.resolution = Resolution::EXTEND_CAPABLE;
        }
        self
    }

    pub fn reference(mut self, image: MediaPayload) -> Self {
        self.reference_images.push(image);
        self
    }

    pub fn style_image(mut self, image: MediaPayload) -> Self {
        self.style_image = Some(image);
        self
    }

    pub fn start_frame(mut self, image: MediaPayload) -> Self {
        self.start_frame = Some(image);
        self
    }

    pub fn end_frame(mut self, image: MediaPayload) -> Self {
        self.end_frame = Some(image);
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn input_video(mut self, input: ExtendInput) -> Self {
        self.input_video = Some(input);
        self
    }

    pub fn build(&self) -> Result<GenerationRequest, ParamsError> {
        let missing = |what| ParamsError::MissingMedia {
            mode: self.mode,
            what,
        };

        let media = match self.mode {
            GenerationMode::TextToVideo => ModeMedia::TextToVideo,
            GenerationMode::ImageToVideo => ModeMedia::ImageToVideo {
                start_frame: self.start_frame.clone().ok_or_else(|| missing("a start frame"))?,
            },
            GenerationMode::ReferencesToVideo => {
                if self.reference_images.len() > MAX_REFERENCE_IMAGES {
                    return Err(ParamsError::TooManyReferences(self.reference_images.len()));
                }
                ModeMedia::ReferencesToVideo {
                    references: self.reference_images.clone(),
                    style: self.style_image.clone(),
                }
            }
            GenerationMode::Interpolation => ModeMedia::Interpolation {
                start_frame: self.start_frame.clone().ok_or_else(|| missing("a start frame"))?,
                end_frame: self.end_frame.clone(),
                looping: self.looping,
            },
            GenerationMode::ExtendVideo => ModeMedia::ExtendVideo(
                self.input_video.clone().ok_or_else(|| missing("an input video"))?,
            ),
        };

        let resolution = if self.mode == GenerationMode::ExtendVideo {
            Resolution::EXTEND_CAPABLE
        } else {
            self.resolution
        };

        Ok(GenerationRequest {
            prompt: self.prompt.clone(),
            model: self.model,
            aspect_ratio: self.aspect_ratio,
            resolution,
            media,
        })
    }
}
