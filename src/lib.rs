//! Reelgen - Veo video generation workflow
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (request parameters, media, error classification)
//! - ports/: Trait definitions (generator, credentials, display)
//! - adapters/: Concrete implementations (Gemini API, local display and key prompt)
//! - application/: Workflow controller, asset bridge, events
//! - config: Environment configuration
//!
//! # Features
//! - `gemini`: HTTP client for the Gemini/Veo API
//! - `cli`: The `reelgen` command-line host (implies `gemini`)

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::controller::{Extension, Submission, WorkflowController, WorkflowError};
pub use config::StudioConfig;
pub use domain::params::{GenerationRequest, RequestBuilder};
pub use domain::workflow::WorkflowState;

#[cfg(feature = "gemini")]
pub use adapters::gemini::GeminiClient;
