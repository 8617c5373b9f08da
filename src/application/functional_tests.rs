//! End-to-end workflow scenarios against mocked ports.

use crate::adapters::local::display::TempFileDisplay;
use crate::application::controller::{Extension, Submission, WorkflowController, WorkflowError};
use crate::application::events::WorkflowEvent;
use crate::domain::classify::INVALID_KEY_MESSAGE;
use crate::domain::media::MediaPayload;
use crate::domain::params::{
    AspectRatio, GenerationMode, GenerationRequest, RemoteHandle, RequestBuilder, Resolution,
    VeoModel,
};
use crate::domain::workflow::{DisplayRef, WorkflowState};
use crate::ports::credentials::{CredentialPort, MockCredentialPort};
use crate::ports::display::MockDisplayPort;
use crate::ports::generator::{GeneratedVideo, MockVideoGenerator, VideoGenerator};
use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn image(name: &str) -> MediaPayload {
    MediaPayload::from_bytes(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

fn references_request(resolution: Resolution) -> GenerationRequest {
    RequestBuilder::new(GenerationMode::ReferencesToVideo)
        .prompt("the presenter waves at the camera")
        .model(VeoModel::VeoFast)
        .aspect_ratio(AspectRatio::Portrait)
        .resolution(resolution)
        .reference(image("presenter.png"))
        .style_image(image("style.png"))
        .build()
        .unwrap()
}

fn video(handle: &str) -> GeneratedVideo {
    GeneratedVideo {
        bytes: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42 video"),
        mime_type: "video/mp4".to_string(),
        handle: RemoteHandle(handle.to_string()),
    }
}

fn display() -> MockDisplayPort {
    let mut display = MockDisplayPort::new();
    display
        .expect_publish()
        .returning(|_, _| Ok(DisplayRef("file:///tmp/reel.mp4".to_string())));
    display.expect_release().returning(|_| ());
    display
}

fn signed_in() -> MockCredentialPort {
    let mut credentials = MockCredentialPort::new();
    credentials
        .expect_has_selected_credential()
        .returning(|| Ok(true));
    credentials.expect_open_selector().returning(|| Ok(()));
    credentials
}

#[tokio::test]
async fn test_submit_without_credential_stays_idle() {
    let mut generator = MockVideoGenerator::new();
    generator.expect_generate().times(0);

    let mut credentials = MockCredentialPort::new();
    credentials
        .expect_has_selected_credential()
        .times(1)
        .returning(|| Ok(false));

    let controller =
        WorkflowController::new(generator, display()).with_credentials(Arc::new(credentials));
    let mut rx = controller.subscribe();

    let result = controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();

    assert_eq!(result, Submission::CredentialRequired);
    assert_eq!(controller.state(), WorkflowState::Idle);
    assert!(controller.credential_dialog_open());
    assert_eq!(
        rx.recv().await.unwrap(),
        WorkflowEvent::CredentialDialog { open: true }
    );
}

#[tokio::test]
async fn test_submit_success_stores_all_representations() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok(video("files/v1")));

    let controller =
        WorkflowController::new(generator, display()).with_credentials(Arc::new(signed_in()));
    let submitted = references_request(Resolution::P720);

    let result = controller.submit(submitted.clone()).await.unwrap();

    assert_eq!(result, Submission::Succeeded);
    assert_eq!(controller.state(), WorkflowState::Success);
    assert_eq!(controller.last_request(), Some(submitted));

    let outcome = controller.outcome().unwrap();
    assert!(!outcome.display.as_str().is_empty());
    assert!(!outcome.bytes.is_empty());
    assert!(!outcome.handle.is_empty());
    assert!(controller.error_message().is_none());
}

#[tokio::test]
async fn test_permission_denied_opens_dialog_and_retains_request() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Err("403: The caller does not have permission denied".into()));

    let controller =
        WorkflowController::new(generator, display()).with_credentials(Arc::new(signed_in()));
    let submitted = references_request(Resolution::P1080);

    let result = controller.submit(submitted.clone()).await.unwrap();

    assert_eq!(result, Submission::Failed);
    assert_eq!(controller.state(), WorkflowState::Error);
    assert_eq!(controller.error_message().as_deref(), Some(INVALID_KEY_MESSAGE));
    assert!(controller.credential_dialog_open());
    assert_eq!(controller.last_request(), Some(submitted));
}

#[tokio::test]
async fn test_retry_after_error_resubmits_identical_request() {
    let submitted = references_request(Resolution::P720);
    let expected = submitted.clone();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .withf(move |request| request == &expected)
        .times(2)
        .returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("503: model overloaded".into())
            } else {
                Ok(video("files/v2"))
            }
        });

    let controller = WorkflowController::new(generator, display());

    controller.submit(submitted.clone()).await.unwrap();
    assert_eq!(controller.state(), WorkflowState::Error);
    assert_eq!(
        controller.error_message().as_deref(),
        Some("Video generation failed: 503: model overloaded")
    );

    let result = controller.retry().await.unwrap();

    assert_eq!(result, Submission::Succeeded);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(controller.last_request(), Some(submitted));
}

#[tokio::test]
async fn test_extend_seeds_extend_request() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .returning(|_| Ok(video("files/v1")));
    let controller = WorkflowController::new(generator, display());

    controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();
    assert!(controller.can_extend());

    let result = controller.extend().unwrap();

    assert_eq!(result, Extension::Seeded);
    assert_eq!(controller.state(), WorkflowState::Idle);
    assert!(controller.outcome().is_none());

    let seeded = controller.form_seed().unwrap().build().unwrap();
    assert_eq!(seeded.mode(), GenerationMode::ExtendVideo);
    assert_eq!(seeded.prompt(), "");
    assert_eq!(seeded.resolution(), Resolution::P720);
    assert_eq!(seeded.model(), VeoModel::VeoFast);
    assert_eq!(seeded.aspect_ratio(), AspectRatio::Portrait);
    assert!(seeded.reference_images().is_empty());
    assert!(seeded.style_image().is_none());
    assert!(seeded.start_frame().is_none());
    assert!(seeded.end_frame().is_none());
    assert!(!seeded.is_looping());

    let input = seeded.input_video().unwrap();
    assert_eq!(input.handle.as_str(), "files/v1");
    assert_eq!(input.video.bytes(), &video("files/v1").bytes);
}

#[tokio::test]
async fn test_extend_not_offered_above_extend_tier() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .returning(|_| Ok(video("files/v1")));
    let controller = WorkflowController::new(generator, display());

    controller
        .submit(references_request(Resolution::P1080))
        .await
        .unwrap();

    assert!(!controller.can_extend());
    assert_eq!(controller.extend().unwrap(), Extension::NotOffered);
    assert_eq!(controller.state(), WorkflowState::Success);
    assert!(controller.outcome().is_some());
    assert!(controller.form_seed().is_none());
}

#[tokio::test]
async fn test_extend_not_offered_outside_success() {
    let controller = WorkflowController::new(MockVideoGenerator::new(), display());

    assert!(!controller.can_extend());
    assert_eq!(controller.extend().unwrap(), Extension::NotOffered);
    assert_eq!(controller.state(), WorkflowState::Idle);
}

/// Yields once before answering so a second submission can observe Loading.
struct YieldingGenerator {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl VideoGenerator for YieldingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GeneratedVideo, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(video("files/v1"))
    }
}

#[tokio::test]
async fn test_concurrent_submits_run_one_generation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = WorkflowController::new(
        YieldingGenerator {
            calls: calls.clone(),
        },
        display(),
    );

    let (first, second) = futures::join!(
        controller.submit(references_request(Resolution::P720)),
        controller.submit(references_request(Resolution::P1080)),
    );

    assert_eq!(first.unwrap(), Submission::Succeeded);
    assert!(matches!(second, Err(WorkflowError::Busy)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        controller.last_request().unwrap().resolution(),
        Resolution::P720
    );
}

#[tokio::test]
async fn test_retry_and_new_video_rejected_while_loading() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = WorkflowController::new(
        YieldingGenerator {
            calls: calls.clone(),
        },
        display(),
    );

    let (first, retried, cleared) = futures::join!(
        controller.submit(references_request(Resolution::P720)),
        controller.retry(),
        async { controller.new_video() },
    );

    assert_eq!(first.unwrap(), Submission::Succeeded);
    assert!(matches!(retried, Err(WorkflowError::Busy)));
    assert!(matches!(cleared, Err(WorkflowError::Busy)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), WorkflowState::Success);
}

/// Always has a key, but yields once while checking.
struct YieldingCredentials;

#[async_trait]
impl CredentialPort for YieldingCredentials {
    async fn has_selected_credential(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        tokio::task::yield_now().await;
        Ok(true)
    }

    async fn open_selector(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

#[tokio::test]
async fn test_retry_abandoned_when_new_video_runs_during_credential_check() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok(video("files/v1")));
    let controller = WorkflowController::new(generator, display())
        .with_credentials(Arc::new(YieldingCredentials));

    controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();

    let (retried, cleared) = futures::join!(controller.retry(), async { controller.new_video() });

    cleared.unwrap();
    assert!(matches!(
        retried,
        Err(WorkflowError::InvalidTransition {
            action: "retry",
            state: WorkflowState::Idle
        })
    ));
    assert_eq!(controller.state(), WorkflowState::Idle);
    assert!(controller.last_request().is_none());
    assert!(controller.outcome().is_none());
}

#[tokio::test]
async fn test_retry_abandoned_when_extend_runs_during_credential_check() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok(video("files/v1")));
    let controller = WorkflowController::new(generator, display())
        .with_credentials(Arc::new(YieldingCredentials));

    controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();

    let (retried, extended) = futures::join!(controller.retry(), async { controller.extend() });

    assert_eq!(extended.unwrap(), Extension::Seeded);
    assert!(matches!(
        retried,
        Err(WorkflowError::InvalidTransition { action: "retry", .. })
    ));
    assert_eq!(controller.state(), WorkflowState::Idle);
    let seeded = controller.form_seed().unwrap().build().unwrap();
    assert_eq!(seeded.mode(), GenerationMode::ExtendVideo);
}

#[tokio::test]
async fn test_credential_dialog_selector_failure_does_not_retry() {
    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Err("400: API key not valid. [reason: API_KEY_INVALID]".into()));

    let mut credentials = MockCredentialPort::new();
    credentials
        .expect_has_selected_credential()
        .returning(|| Ok(true));
    credentials
        .expect_open_selector()
        .times(1)
        .returning(|| Err("selector dismissed".into()));

    let controller =
        WorkflowController::new(generator, display()).with_credentials(Arc::new(credentials));

    controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();
    assert!(controller.credential_dialog_open());

    assert_eq!(controller.continue_credential_dialog().await.unwrap(), None);
    assert_eq!(controller.state(), WorkflowState::Error);
    assert_eq!(controller.error_message().as_deref(), Some(INVALID_KEY_MESSAGE));
    assert!(controller.last_request().is_some());
}

#[tokio::test]
async fn test_credential_dialog_continue_retries_failed_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut generator = MockVideoGenerator::new();
    generator.expect_generate().times(2).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err("400: API key not valid. Please pass a valid API key. [reason: API_KEY_INVALID]".into())
        } else {
            Ok(video("files/v1"))
        }
    });

    let mut credentials = MockCredentialPort::new();
    credentials
        .expect_has_selected_credential()
        .returning(|| Ok(true));
    credentials.expect_open_selector().times(1).returning(|| Ok(()));

    let controller =
        WorkflowController::new(generator, display()).with_credentials(Arc::new(credentials));

    controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();
    assert!(controller.credential_dialog_open());

    let retried = controller.continue_credential_dialog().await.unwrap();

    assert_eq!(retried, Some(Submission::Succeeded));
    assert!(!controller.credential_dialog_open());
    assert_eq!(controller.state(), WorkflowState::Success);
}

#[tokio::test]
async fn test_credential_dialog_continue_from_idle_does_not_submit() {
    let mut generator = MockVideoGenerator::new();
    generator.expect_generate().times(0);

    let mut credentials = MockCredentialPort::new();
    credentials
        .expect_open_selector()
        .times(1)
        .returning(|| Err("selector closed".into()));

    let controller =
        WorkflowController::new(generator, display()).with_credentials(Arc::new(credentials));

    assert_eq!(controller.continue_credential_dialog().await.unwrap(), None);
    assert_eq!(controller.state(), WorkflowState::Idle);
}

#[tokio::test]
async fn test_display_files_do_not_accumulate() {
    let dir = tempdir().unwrap();
    let display = TempFileDisplay::new(dir.path()).unwrap();

    let mut generator = MockVideoGenerator::new();
    generator
        .expect_generate()
        .returning(|_| Ok(video("files/v1")));
    let controller = WorkflowController::new(generator, display.clone());

    controller
        .submit(references_request(Resolution::P720))
        .await
        .unwrap();
    controller.retry().await.unwrap();
    assert_eq!(display.live_count(), 1);

    controller.extend().unwrap();
    assert_eq!(display.live_count(), 0);

    let extend = controller.form_seed().unwrap().prompt("zoom out").build().unwrap();
    controller.submit(extend).await.unwrap();
    assert_eq!(display.live_count(), 1);

    controller.new_video().unwrap();
    assert_eq!(display.live_count(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
