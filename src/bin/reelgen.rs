//! Reelgen Binary - Veo video generation from the command line
//!
//! The terminal stands in for the form and result surfaces. It wires up:
//! - Gemini API generation client
//! - Temp-file display and terminal API key prompt
//! - The workflow controller, with optional extend chaining

use clap::Parser;
use reelgen::adapters::gemini::GeminiClient;
use reelgen::adapters::local::{ApiKey, PromptCredentials, TempFileDisplay};
use reelgen::application::controller::{Extension, Submission, WorkflowController};
use reelgen::application::events::WorkflowEvent;
use reelgen::application::seed;
use reelgen::config::StudioConfig;
use reelgen::domain::media::{mime_for, MediaPayload};
use reelgen::domain::params::{
    AspectRatio, GenerationMode, GenerationRequest, RequestBuilder, Resolution, VeoModel,
};
use reelgen::domain::workflow::WorkflowState;
use reelgen::ports::display::DisplayPort;
use reelgen::ports::generator::VideoGenerator;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "reelgen", version, about = "Generate and extend videos with Veo")]
struct Args {
    /// Prompt; without one the built-in presenter example runs
    #[arg(short, long)]
    prompt: Option<String>,

    /// text, image, references or frames
    #[arg(long, default_value = "text")]
    mode: GenerationMode,

    /// veo or veo-fast
    #[arg(long, default_value = "veo")]
    model: VeoModel,

    /// 16:9 or 9:16
    #[arg(long, default_value = "16:9")]
    aspect: AspectRatio,

    /// 720p or 1080p (only 720p videos can be extended)
    #[arg(long, default_value = "720p")]
    resolution: Resolution,

    /// Reference image (references mode, up to 3)
    #[arg(long = "reference")]
    references: Vec<PathBuf>,

    /// Style image (references mode)
    #[arg(long)]
    style: Option<PathBuf>,

    /// First frame (image and frames modes)
    #[arg(long)]
    start_frame: Option<PathBuf>,

    /// Last frame (frames mode)
    #[arg(long)]
    end_frame: Option<PathBuf>,

    /// End on the start frame (frames mode)
    #[arg(long = "loop")]
    looping: bool,

    /// Extend the result with this prompt; repeat to chain extensions
    #[arg(long)]
    extend: Vec<String>,

    /// Extra attempts after a failed generation
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Directory for finished videos (defaults to OUTPUT_DIR)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let config = match StudioConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args, config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, config: StudioConfig) -> Result<(), BoxError> {
    // 1. Adapters
    let key = ApiKey::new(config.api_key.clone());
    let credentials = Arc::new(PromptCredentials::new(key.clone()));
    let generator = GeminiClient::new(&config, key);
    let display = TempFileDisplay::new(&config.display_dir)?;

    // 2. Workflow
    let controller = WorkflowController::new(generator, display).with_credentials(credentials);
    spawn_listener(controller.subscribe());

    if !controller.check_credentials().await {
        controller.continue_credential_dialog().await?;
    }

    let form = match &args.prompt {
        Some(prompt) => form_from_args(&args, prompt).await?,
        None => {
            println!("No prompt given, running the built-in example");
            seed::initial_form()?
        }
    };
    controller.seed_form(form);

    let output_dir = args.output.clone().unwrap_or(config.output_dir.clone());
    tokio::fs::create_dir_all(&output_dir).await?;

    // 3. Generate, then extend once per --extend prompt
    let mut request = controller
        .form_seed()
        .ok_or("no form to submit")?
        .build()?;
    let mut extensions = args.extend.iter();

    for index in 0.. {
        generate(&controller, &request, args.retries).await?;
        save(&controller, &output_dir, index).await?;

        let Some(prompt) = extensions.next() else {
            break;
        };
        if controller.extend()? == Extension::NotOffered {
            return Err(format!(
                "{} videos cannot be extended; generate at {}",
                request.resolution().as_str(),
                Resolution::EXTEND_CAPABLE.as_str()
            )
            .into());
        }
        request = controller
            .form_seed()
            .ok_or("extend did not seed a request")?
            .prompt(prompt.as_str())
            .build()?;
    }

    // Releases the last displayed copy
    controller.new_video()?;
    Ok(())
}

async fn form_from_args(args: &Args, prompt: &str) -> Result<RequestBuilder, BoxError> {
    let mut form = RequestBuilder::new(args.mode)
        .prompt(prompt)
        .model(args.model)
        .aspect_ratio(args.aspect)
        .resolution(args.resolution)
        .looping(args.looping);

    for path in &args.references {
        form = form.reference(load_media(path).await?);
    }
    if let Some(path) = &args.style {
        form = form.style_image(load_media(path).await?);
    }
    if let Some(path) = &args.start_frame {
        form = form.start_frame(load_media(path).await?);
    }
    if let Some(path) = &args.end_frame {
        form = form.end_frame(load_media(path).await?);
    }
    Ok(form)
}

async fn load_media(path: &Path) -> Result<MediaPayload, BoxError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let mime_type = mime_for(&file_name);
    Ok(MediaPayload::from_bytes(file_name, mime_type, bytes))
}

/// Submit `request`, retrying up to `retries` times. Credential problems go
/// through the dialog, which retries on its own once a key is picked.
async fn generate<G, D>(
    controller: &WorkflowController<G, D>,
    request: &GenerationRequest,
    retries: u32,
) -> Result<(), BoxError>
where
    G: VideoGenerator,
    D: DisplayPort,
{
    let mut result = controller.submit(request.clone()).await?;
    let mut attempts = 0;

    loop {
        let failure = match result {
            Submission::Succeeded => return Ok(()),
            Submission::Failed => controller.error_message().unwrap_or_default(),
            Submission::CredentialRequired => "An API key is required to generate videos.".to_string(),
        };
        if attempts == retries {
            return Err(failure.into());
        }
        attempts += 1;
        warn!("Attempt failed ({}/{}): {}", attempts, retries, failure);

        result = if result == Submission::Failed && !controller.credential_dialog_open() {
            controller.retry().await?
        } else {
            match controller.continue_credential_dialog().await? {
                Some(result) => result,
                // The selector failed after an error; the key is unchanged
                None if controller.state() == WorkflowState::Error => return Err(failure.into()),
                None => controller.submit(request.clone()).await?,
            }
        };
    }
}

async fn save<G, D>(
    controller: &WorkflowController<G, D>,
    output_dir: &Path,
    index: usize,
) -> Result<(), BoxError>
where
    G: VideoGenerator,
    D: DisplayPort,
{
    let outcome = controller.outcome().ok_or("no video to save")?;
    let extension = match outcome.mime_type.as_str() {
        "video/webm" => "webm",
        _ => "mp4",
    };
    let path = output_dir.join(format!("reel-{}.{}", index, extension));
    tokio::fs::write(&path, &outcome.bytes).await?;

    println!("Saved {} ({})", path.display(), outcome.display);
    Ok(())
}

fn spawn_listener(mut rx: broadcast::Receiver<WorkflowEvent>) {
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                WorkflowEvent::StateChanged(state) => info!("Workflow is {}", state),
                WorkflowEvent::CredentialDialog { open: true } => {
                    println!(
                        "Veo requires an API key from a paid Google Cloud project with billing enabled. \
                         See https://ai.google.dev/gemini-api/docs/billing"
                    );
                }
                WorkflowEvent::CredentialDialog { open: false } => {}
                WorkflowEvent::FormSeeded => info!("Form updated"),
            }
        }
    });
}
