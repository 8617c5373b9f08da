//! Generation workflow state machine.
//!
//! Owns the single retained request/outcome pair and drives it through
//! Idle -> Loading -> Success | Error. Every method takes `&self`; state sits
//! behind a mutex that is never held across an await, and the move into
//! Loading is a check-and-set under that lock, so at most one generation is
//! ever in flight no matter how submissions arrive.

use crate::application::bridge::{self, BridgeError};
use crate::application::events::{EventHub, WorkflowEvent};
use crate::domain::classify::classify_error;
use crate::domain::params::{GenerationRequest, RequestBuilder};
use crate::domain::workflow::{DisplayRef, GenerationOutcome, WorkflowState};
use crate::ports::credentials::CredentialPort;
use crate::ports::display::DisplayPort;
use crate::ports::generator::{GeneratedVideo, VideoGenerator};
use parking_lot::Mutex;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Shown when the service reports success but there is nothing to display.
pub const MISSING_VIDEO_MESSAGE: &str = "Video generated, but URL is missing. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("a generation is already in flight")]
    Busy,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: WorkflowState,
    },

    #[error("no previous request to retry")]
    NothingToRetry,

    #[error("Failed to prepare video for extension: {0}")]
    Bridge(#[from] BridgeError),
}

/// How a submission ended. Generation failures are not errors here: they
/// land in the Error state with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Succeeded,
    Failed,
    /// Blocked before reaching the service; the credential dialog is open.
    CredentialRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// The form now holds an extend-mode request; state is Idle.
    Seeded,
    /// Extension is not available from the current state or resolution.
    NotOffered,
}

#[derive(Debug, Default)]
struct Inner {
    state: WorkflowState,
    last_request: Option<GenerationRequest>,
    outcome: Option<GenerationOutcome>,
    error_message: Option<String>,
    form_seed: Option<RequestBuilder>,
    credential_dialog: bool,
}

pub struct WorkflowController<G, D> {
    generator: G,
    display: D,
    credentials: Option<Arc<dyn CredentialPort>>,
    inner: Mutex<Inner>,
    events: EventHub,
}

impl<G, D> WorkflowController<G, D>
where
    G: VideoGenerator,
    D: DisplayPort,
{
    /// A controller with no credential capability: every submission passes the gate.
    pub fn new(generator: G, display: D) -> Self {
        Self {
            generator,
            display,
            credentials: None,
            inner: Mutex::new(Inner::default()),
            events: EventHub::new(),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialPort>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.lock().state
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.lock().error_message.clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.inner.lock().last_request.clone()
    }

    pub fn outcome(&self) -> Option<GenerationOutcome> {
        self.inner.lock().outcome.clone()
    }

    /// Values the form should show when it next becomes editable.
    pub fn form_seed(&self) -> Option<RequestBuilder> {
        self.inner.lock().form_seed.clone()
    }

    pub fn credential_dialog_open(&self) -> bool {
        self.inner.lock().credential_dialog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Extension is offered only for a success produced at the extend-capable tier.
    pub fn can_extend(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == WorkflowState::Success
            && inner
                .last_request
                .as_ref()
                .is_some_and(|r| r.resolution().is_extend_capable())
    }

    /// Pre-fill the form, e.g. with the built-in example on first launch.
    pub fn seed_form(&self, form: RequestBuilder) {
        self.inner.lock().form_seed = Some(form);
        self.events.publish(WorkflowEvent::FormSeeded);
    }

    /// Startup check: opens the credential dialog when none is selected.
    /// Returns whether submissions would currently pass the gate.
    pub async fn check_credentials(&self) -> bool {
        let allowed = self.credential_gate().await;
        if !allowed {
            self.set_credential_dialog(true);
        }
        allowed
    }

    /// Start a new attempt from Idle or Error.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Submission, WorkflowError> {
        self.attempt(request, false).await
    }

    /// Resubmit the retained request unchanged, from Error or Success.
    pub async fn retry(&self) -> Result<Submission, WorkflowError> {
        let (state, request) = {
            let inner = self.inner.lock();
            (inner.state, inner.last_request.clone())
        };

        match state {
            WorkflowState::Loading => Err(WorkflowError::Busy),
            WorkflowState::Idle => Err(WorkflowError::InvalidTransition {
                action: "retry",
                state,
            }),
            WorkflowState::Error | WorkflowState::Success => {
                let request = request.ok_or(WorkflowError::NothingToRetry)?;
                self.attempt(request, true).await
            }
        }
    }

    /// Leave Error for Idle with the failed request restored into the form.
    pub fn try_again(&self) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock();
        if inner.state != WorkflowState::Error {
            return Err(WorkflowError::InvalidTransition {
                action: "try again",
                state: inner.state,
            });
        }

        let restored = inner.last_request.as_ref().map(GenerationRequest::to_builder);
        let Some(form) = restored else {
            drop(inner);
            return self.new_video();
        };

        inner.form_seed = Some(form);
        inner.state = WorkflowState::Idle;
        inner.error_message = None;
        drop(inner);

        info!("Restored failed request for editing");
        self.events.publish(WorkflowEvent::FormSeeded);
        self.events.publish(WorkflowEvent::StateChanged(WorkflowState::Idle));
        Ok(())
    }

    /// Drop everything retained and return to a blank form.
    pub fn new_video(&self) -> Result<(), WorkflowError> {
        let superseded = {
            let mut inner = self.inner.lock();
            if inner.state == WorkflowState::Loading {
                return Err(WorkflowError::Busy);
            }
            let superseded = inner.outcome.take();
            *inner = Inner {
                credential_dialog: inner.credential_dialog,
                ..Inner::default()
            };
            superseded
        };

        if let Some(outcome) = superseded {
            self.display.release(&outcome.display);
        }
        self.events.publish(WorkflowEvent::StateChanged(WorkflowState::Idle));
        Ok(())
    }

    /// Seed the form with an extend-mode request built from the current
    /// success and return to Idle. A bridge failure leaves Success intact.
    pub fn extend(&self) -> Result<Extension, WorkflowError> {
        let mut inner = self.inner.lock();
        if inner.state != WorkflowState::Success {
            return Ok(Extension::NotOffered);
        }
        let (Some(prior), Some(outcome)) = (inner.last_request.as_ref(), inner.outcome.as_ref())
        else {
            return Ok(Extension::NotOffered);
        };
        if !prior.resolution().is_extend_capable() {
            return Ok(Extension::NotOffered);
        }

        let form = match bridge::extend_form(prior, outcome) {
            Ok(form) => form,
            Err(e) => {
                let e = WorkflowError::Bridge(e);
                error!("Failed to process video for extension: {}", e);
                inner.error_message = Some(e.to_string());
                return Err(e);
            }
        };

        let superseded = inner.outcome.take();
        inner.form_seed = Some(form);
        inner.error_message = None;
        inner.state = WorkflowState::Idle;
        drop(inner);

        if let Some(outcome) = superseded {
            self.display.release(&outcome.display);
        }
        info!("Seeded extend request from previous video");
        self.events.publish(WorkflowEvent::FormSeeded);
        self.events.publish(WorkflowEvent::StateChanged(WorkflowState::Idle));
        Ok(Extension::Seeded)
    }

    /// The user confirmed the credential dialog: let them pick a credential,
    /// then retry automatically if the last attempt failed. Nothing is retried
    /// when the selector fails.
    pub async fn continue_credential_dialog(&self) -> Result<Option<Submission>, WorkflowError> {
        self.set_credential_dialog(false);

        if let Some(credentials) = &self.credentials {
            if let Err(e) = credentials.open_selector().await {
                warn!("Credential selector failed: {}", e);
                return Ok(None);
            }
        }

        let should_retry = {
            let inner = self.inner.lock();
            inner.state == WorkflowState::Error && inner.last_request.is_some()
        };
        if should_retry {
            return self.retry().await.map(Some);
        }
        Ok(None)
    }

    async fn attempt(
        &self,
        request: GenerationRequest,
        from_success: bool,
    ) -> Result<Submission, WorkflowError> {
        let action = if from_success { "retry" } else { "submit" };

        // 1. Reject early so a busy controller never touches the credential check
        let (started_state, started_request) = {
            let inner = self.inner.lock();
            Self::check_can_start(inner.state, from_success, action)?;
            (inner.state, inner.last_request.clone())
        };

        // 2. Credential gate
        if !self.credential_gate().await {
            self.set_credential_dialog(true);
            return Ok(Submission::CredentialRequired);
        }

        // 3. Enter Loading, unless the workflow moved on while the gate was awaited
        let superseded = {
            let mut inner = self.inner.lock();
            if inner.state == WorkflowState::Loading {
                return Err(WorkflowError::Busy);
            }
            if inner.state != started_state || inner.last_request != started_request {
                return Err(WorkflowError::InvalidTransition {
                    action,
                    state: inner.state,
                });
            }
            inner.state = WorkflowState::Loading;
            inner.error_message = None;
            inner.last_request = Some(request.clone());
            inner.form_seed = None;
            inner.outcome.take()
        };
        if let Some(outcome) = superseded {
            self.display.release(&outcome.display);
        }
        self.events.publish(WorkflowEvent::StateChanged(WorkflowState::Loading));
        info!(
            "Generating {} video ({}, {}, {})",
            request.mode(),
            request.model().id(),
            request.aspect_ratio().as_str(),
            request.resolution().as_str()
        );

        // 4. Generate
        match self.generator.generate(&request).await {
            Ok(video) => Ok(self.install(video)),
            Err(e) => {
                self.fail(e);
                Ok(Submission::Failed)
            }
        }
    }

    fn install(&self, video: GeneratedVideo) -> Submission {
        let display: Result<DisplayRef, Box<dyn Error + Send + Sync>> = if video.bytes.is_empty() {
            Err("generated video is empty".into())
        } else {
            self.display.publish(&video.bytes, &video.mime_type)
        };

        let display = match display {
            Ok(display) => display,
            Err(e) => {
                error!("Generation succeeded without a displayable video: {}", e);
                self.enter_error(MISSING_VIDEO_MESSAGE.to_string());
                return Submission::Failed;
            }
        };

        info!("Video ready: {} ({} bytes)", video.handle, video.bytes.len());
        self.inner.lock().outcome = Some(GenerationOutcome {
            display,
            bytes: video.bytes,
            mime_type: video.mime_type,
            handle: video.handle,
        });
        self.transition(WorkflowState::Success);
        Submission::Succeeded
    }

    fn fail(&self, e: Box<dyn Error + Send + Sync>) {
        error!("Video generation failed: {}", e);
        let classification = classify_error(e.as_ref());
        self.enter_error(classification.message);
        if classification.reopen_credentials {
            self.set_credential_dialog(true);
        }
    }

    fn enter_error(&self, message: String) {
        self.inner.lock().error_message = Some(message);
        self.transition(WorkflowState::Error);
    }

    fn transition(&self, state: WorkflowState) {
        self.inner.lock().state = state;
        self.events.publish(WorkflowEvent::StateChanged(state));
    }

    fn set_credential_dialog(&self, open: bool) {
        self.inner.lock().credential_dialog = open;
        self.events.publish(WorkflowEvent::CredentialDialog { open });
    }

    fn check_can_start(
        state: WorkflowState,
        from_success: bool,
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        match state {
            WorkflowState::Loading => Err(WorkflowError::Busy),
            WorkflowState::Success if from_success => Ok(()),
            state if state.accepts_submit() => Ok(()),
            state => Err(WorkflowError::InvalidTransition { action, state }),
        }
    }

    /// A missing capability always passes; a failing check counts as "no credential".
    async fn credential_gate(&self) -> bool {
        let Some(credentials) = &self.credentials else {
            return true;
        };

        match credentials.has_selected_credential().await {
            Ok(selected) => selected,
            Err(e) => {
                warn!("Credential check failed, assuming no key selected: {}", e);
                false
            }
        }
    }
}
