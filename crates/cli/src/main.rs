use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use framesift_core::pipeline::pipeline_config::{FrameErrorPolicy, PipelineConfig};
use framesift_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use framesift_core::pipeline::result_reducer::ResultOrder;
use framesift_core::pipeline::video_classification_service::VideoClassificationService;
use framesift_core::shared::constants::{
    CLASSIFIER_MODEL_NAME, CLASSIFIER_MODEL_URL, LABELS_FILE_NAME, LABELS_URL, MAX_UPLOAD_BYTES,
};
use framesift_core::shared::error::PipelineError;
use framesift_core::shared::model_resolver::{self, AssetSource};
use framesift_core::upload::response::ErrorResponse;
use framesift_core::upload::upload_handler::{UploadHandler, UploadPolicy};

/// Samples frames from a video, classifies them and reports the most
/// confident observation of every label.
#[derive(Parser, Debug)]
#[command(name = "framesift")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Free text echoed back in the response.
    #[arg(long)]
    description: Option<String>,

    /// JSON pipeline configuration. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classify every Nth frame.
    #[arg(long)]
    stride: Option<usize>,

    /// Labels kept per classified frame.
    #[arg(long)]
    top_k: Option<usize>,

    /// What to do when a frame cannot be classified: abort or skip.
    #[arg(long)]
    on_frame_error: Option<FrameErrorPolicy>,

    /// Classifier model (ONNX). Resolved from the model directories when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Label file (JSON array or one label per line).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Directory searched for bundled model assets instead of `Resources/`
    /// next to the executable.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Download missing model assets into the user cache.
    #[arg(long)]
    download_models: bool,

    /// Reject inputs larger than this many bytes.
    #[arg(long, default_value_t = MAX_UPLOAD_BYTES)]
    max_upload_bytes: u64,

    /// Cancel the run after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Result order: label, confidence or none.
    #[arg(long, default_value = "none")]
    sort: ResultOrder,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(exit_code(e.as_ref()));
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(cli)?;
    let staging_dir = config.scratch_root();

    let model_path = resolve_asset(
        cli.model.as_ref(),
        CLASSIFIER_MODEL_NAME,
        CLASSIFIER_MODEL_URL,
        cli,
    )?;
    let labels_path = resolve_asset(cli.labels.as_ref(), LABELS_FILE_NAME, LABELS_URL, cli)?;
    let service = VideoClassificationService::from_assets(config, &model_path, &labels_path)?;

    let handler = UploadHandler::new(
        Arc::new(service),
        UploadPolicy {
            max_bytes: cli.max_upload_bytes,
            timeout: cli.timeout_secs.map(Duration::from_secs),
            staging_dir,
            order: cli.sort,
        },
    );

    match handler.handle(
        &cli.input,
        cli.description.clone(),
        Box::new(SummaryPipelineLogger::default()),
    ) {
        Ok(response) => {
            if let Some(frame) = response.best_frame() {
                log::info!("Most confident frame: {}", frame.display());
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            Err(e.into())
        }
    }
}

/// Defaults, then the JSON file, then flags.
fn build_config(cli: &Cli) -> Result<PipelineConfig, PipelineError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(stride) = cli.stride {
        config.stride = stride;
    }
    if let Some(top_k) = cli.top_k {
        config.top_k = top_k;
    }
    if let Some(policy) = cli.on_frame_error {
        config.on_frame_error = policy;
    }
    config.validate()?;
    Ok(config)
}

fn resolve_asset(
    explicit: Option<&PathBuf>,
    name: &'static str,
    url: &str,
    cli: &Cli,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    log::info!("Resolving asset: {name}");
    let path = model_resolver::resolve(
        &AssetSource {
            name,
            url,
            bundled_dir: cli.models_dir.clone(),
            allow_download: cli.download_models,
        },
        Some(Box::new(move |downloaded, total| {
            download_progress(name, downloaded, total)
        })),
    )?;
    Ok(path)
}

/// 2 for problems with the input itself, 1 for everything else.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<PipelineError>() {
        Some(e) if e.is_client_error() => 2,
        _ => 1,
    }
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
