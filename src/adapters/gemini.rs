//! Veo generation over the Gemini REST API.
//!
//! A generation is a long-running operation: start it, poll it until it is
//! done, then download the first generated sample. Service errors are passed
//! on as `"{status}: {body}"` text so the workflow can classify them.

use crate::adapters::local::keyring::ApiKey;
use crate::config::StudioConfig;
use crate::domain::media::MediaPayload;
use crate::domain::params::{GenerationRequest, ModeMedia, RemoteHandle};
use crate::ports::generator::{GeneratedVideo, VideoGenerator};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key not valid. No API key has been selected.")]
    MissingKey,

    #[error("{status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Operation(String),

    #[error("operation {name} still running after {polls} polls")]
    TimedOut { name: String, polls: u32 },

    #[error("generation finished without a video{0}")]
    NoVideo(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage<'a> {
    bytes_base64_encoded: &'a str,
    mime_type: &'a str,
}

impl<'a> From<&'a MediaPayload> for InlineImage<'a> {
    fn from(media: &'a MediaPayload) -> Self {
        Self {
            bytes_base64_encoded: media.base64(),
            mime_type: media.mime_type(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceImage<'a> {
    image: InlineImage<'a>,
    reference_type: &'static str,
}

#[derive(Serialize)]
struct VideoUri<'a> {
    uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<InlineImage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reference_images: Vec<ReferenceImage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoUri<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    aspect_ratio: &'static str,
    resolution: &'static str,
    number_of_videos: u32,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters,
}

fn predict_body(request: &GenerationRequest) -> PredictRequest<'_> {
    let mut instance = Instance {
        prompt: request.prompt(),
        image: None,
        last_frame: None,
        reference_images: Vec::new(),
        video: None,
    };

    match request.media() {
        ModeMedia::TextToVideo => {}
        ModeMedia::ImageToVideo { start_frame } => {
            instance.image = Some(start_frame.into());
        }
        ModeMedia::ReferencesToVideo { references, style } => {
            instance.reference_images = references
                .iter()
                .map(|image| ReferenceImage {
                    image: image.into(),
                    reference_type: "asset",
                })
                .chain(style.iter().map(|image| ReferenceImage {
                    image: image.into(),
                    reference_type: "style",
                }))
                .collect();
        }
        ModeMedia::Interpolation {
            start_frame,
            end_frame,
            looping,
        } => {
            instance.image = Some(start_frame.into());
            // A loop ends where it started
            let last = if *looping {
                Some(start_frame)
            } else {
                end_frame.as_ref()
            };
            instance.last_frame = last.map(InlineImage::from);
        }
        ModeMedia::ExtendVideo(input) => {
            instance.video = Some(VideoUri {
                uri: input.handle.as_str(),
            });
        }
    }

    PredictRequest {
        instances: [instance],
        parameters: Parameters {
            aspect_ratio: request.aspect_ratio().as_str(),
            resolution: request.resolution().as_str(),
            number_of_videos: 1,
        },
    }
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationStatus>,
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<SampleVideo>,
}

#[derive(Debug, Deserialize)]
struct SampleVideo {
    uri: Option<String>,
}

impl Operation {
    /// URI of the first sample of a finished operation.
    fn video_uri(self) -> Result<String, GeminiError> {
        if let Some(status) = self.error {
            return Err(GeminiError::Operation(status.message));
        }

        let response = self.response.and_then(|r| r.generate_video_response);
        let filtered = response
            .as_ref()
            .map(|r| r.rai_media_filtered_reasons.join("; "))
            .unwrap_or_default();

        response
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|sample| sample.video)
            .and_then(|video| video.uri)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| {
                if filtered.is_empty() {
                    GeminiError::NoVideo(String::new())
                } else {
                    GeminiError::NoVideo(format!(": {}", filtered))
                }
            })
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    key: ApiKey,
    poll_interval: Duration,
    max_polls: u32,
}

impl GeminiClient {
    pub fn new(config: &StudioConfig, key: ApiKey) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key,
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
        }
    }

    fn api_key(&self) -> Result<String, GeminiError> {
        self.key.get().ok_or(GeminiError::MissingKey)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GeminiError::Http { status, body })
    }

    async fn start(&self, request: &GenerationRequest) -> Result<Operation, GeminiError> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url,
            request.model().id()
        );

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .json(&predict_body(request))
            .send()
            .await?;

        Ok(Self::checked(response).await?.json().await?)
    }

    async fn poll(&self, name: &str) -> Result<Operation, GeminiError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, name))
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;

        Ok(Self::checked(response).await?.json().await?)
    }

    async fn wait(&self, mut operation: Operation) -> Result<Operation, GeminiError> {
        let mut polls = 0;
        while !operation.done {
            if polls == self.max_polls {
                return Err(GeminiError::TimedOut {
                    name: operation.name,
                    polls,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            debug!("Polling {} ({}/{})", operation.name, polls, self.max_polls);
            operation = self.poll(&operation.name).await?;
        }
        Ok(operation)
    }

    async fn download(&self, uri: &str) -> Result<(bytes::Bytes, String), GeminiError> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();

        Ok((response.bytes().await?, mime_type))
    }

    async fn run(&self, request: &GenerationRequest) -> Result<GeneratedVideo, GeminiError> {
        let operation = self.start(request).await?;
        info!("Started operation {}", operation.name);

        let uri = self.wait(operation).await?.video_uri()?;
        let (bytes, mime_type) = self.download(&uri).await?;
        info!("Downloaded {} bytes from {}", bytes.len(), uri);

        Ok(GeneratedVideo {
            bytes,
            mime_type,
            handle: RemoteHandle(uri),
        })
    }
}

#[async_trait]
impl VideoGenerator for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedVideo, Box<dyn Error + Send + Sync>> {
        Ok(self.run(request).await?)
    }
}
