use crate::domain::params::RemoteHandle;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Form editable, possibly seeded from a previous attempt.
    #[default]
    Idle,
    /// Attempt in flight; input is frozen.
    Loading,
    Success,
    Error,
}

impl WorkflowState {
    /// States from which a new attempt may start.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Locally constructed reference used to render a produced video right away.
/// Invalidated when the outcome it belongs to is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayRef(pub String);

impl DisplayRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three views of one generated video, stored and dropped together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub display: DisplayRef,
    pub bytes: Bytes,
    pub mime_type: String,
    pub handle: RemoteHandle,
}
