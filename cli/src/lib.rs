//! Command-line interface for voxpost.
//!
//! Wires the recording-and-submission workflow to a terminal: record
//! from the microphone, transcribe an existing file, or check the
//! backend's health.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use voxpost_client::config::Config;
use voxpost_client::notify::{Notifier, TerminalNotifier};
use voxpost_client::present::Presenter;
use voxpost_client::service::{Method, TranscriptionService};
use voxpost_client::session::SessionState;
use voxpost_client::workflow::{SUBMIT_BUSY_LABEL, Workflow};
use voxpost_client::{audio, dirs};

/// Application-specific environment variable for log filtering (overrides config).
const LOG_ENV_VAR: &str = "VOXPOST_LOG";

#[derive(Parser)]
#[command(name = "voxpost")]
#[command(about = "Voxpost - record or upload audio and transcribe it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record from the microphone, then transcribe the recording
    Record {
        #[command(flatten)]
        submit: SubmitArgs,
        /// Keep the recorded audio as a WAV file
        #[arg(long, value_name = "PATH")]
        keep_audio: Option<PathBuf>,
    },
    /// Transcribe an existing audio file
    Transcribe {
        /// Audio file to submit
        file: PathBuf,
        #[command(flatten)]
        submit: SubmitArgs,
    },
    /// Show transcription service status
    Status,
}

#[derive(clap::Args)]
struct SubmitArgs {
    /// Transcription method (wav2vec2 or google)
    #[arg(long)]
    method: Option<Method>,
    /// Copy the transcription to the clipboard
    #[arg(long)]
    copy: bool,
    /// Save the transcription report to a date-stamped file
    #[arg(long)]
    save: bool,
    /// Save the transcription report to PATH (implies --save)
    #[arg(long, value_name = "PATH")]
    save_to: Option<PathBuf>,
    /// Share the transcription (falls back to copy on this platform)
    #[arg(long)]
    share: bool,
}

/// Entry point for the CLI: configures logging and dispatches the
/// selected command.
pub async fn run() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    init_logging(&config)?;

    let cli = Cli::parse();
    tracing::debug!(base_url = %config.server.base_url, "Loaded configuration");

    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
    let service = TranscriptionService::new(&config.server.base_url, config.server.timeout())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    match cli.command {
        Commands::Record { submit, keep_audio } => {
            record(&config, service, notifier, submit, keep_audio).await
        }
        Commands::Transcribe { file, submit } => {
            transcribe(&config, service, notifier, file, submit).await
        }
        Commands::Status => status(&service).await,
    }
}

fn init_logging(config: &Config) -> Result<()> {
    // VOXPOST_LOG env var overrides config file level
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(config.logging.level.as_directive().parse()?)
        .from_env()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

async fn record(
    config: &Config,
    service: TranscriptionService,
    notifier: Arc<dyn Notifier>,
    submit: SubmitArgs,
    keep_audio: Option<PathBuf>,
) -> Result<()> {
    let mut workflow = Workflow::new(Box::new(audio::MicBackend), service, notifier.clone());

    workflow
        .start_recording()
        .map_err(|e| anyhow::anyhow!(e))?;
    if workflow.session().state() != SessionState::Recording {
        // Microphone failure was already reported through the notifier.
        return Ok(());
    }

    println!("{}", workflow.controls().status);
    println!("Press Enter to stop recording.");

    wait_for_stop(&mut workflow).await?;
    workflow.stop_recording();
    println!("{}", workflow.controls().status);

    if let Some(path) = keep_audio {
        let path = resolve_keep_path(path)?;
        workflow.save_recording(&path)?;
        println!("Recording saved to {}", path.display());
    }

    let method = submit.method.unwrap_or(config.transcription.method);
    let spinner = spinner(SUBMIT_BUSY_LABEL);
    let result = workflow.transcribe_recording(method).await;
    spinner.finish_and_clear();

    present(notifier, result, &submit);
    Ok(())
}

/// Poll the capture stream for fragments until the user presses Enter.
async fn wait_for_stop(workflow: &mut Workflow) -> Result<()> {
    let mut poll = tokio::time::interval(Duration::from_millis(10));
    let mut input = String::new();
    let mut reader = tokio::io::BufReader::new(tokio::io::stdin());
    let stop = reader.read_line(&mut input);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = poll.tick() => workflow.poll_chunks(),
            result = &mut stop => {
                result.context("Failed to read stdin")?;
                return Ok(());
            }
        }
    }
}

async fn transcribe(
    config: &Config,
    service: TranscriptionService,
    notifier: Arc<dyn Notifier>,
    file: PathBuf,
    submit: SubmitArgs,
) -> Result<()> {
    let mut workflow = Workflow::new(Box::new(audio::MicBackend), service, notifier.clone());

    let method = submit.method.unwrap_or(config.transcription.method);
    let spinner = spinner(SUBMIT_BUSY_LABEL);
    let result = workflow.transcribe_file(&file, method).await;
    spinner.finish_and_clear();

    present(notifier, result, &submit);
    Ok(())
}

fn present(
    notifier: Arc<dyn Notifier>,
    result: Option<voxpost_client::service::Transcription>,
    submit: &SubmitArgs,
) {
    let Some(result) = result else {
        // Failure was already reported through the notifier.
        return;
    };

    let mut presenter = Presenter::with_system_targets(notifier);
    println!("\n{}", presenter.render(result));

    if submit.copy {
        presenter.copy();
    }
    if submit.save || submit.save_to.is_some() {
        presenter.save(submit.save_to.as_deref());
    }
    if submit.share {
        presenter.share();
    }
}

async fn status(service: &TranscriptionService) -> Result<()> {
    match service.health().await {
        Ok(health) => {
            println!("Service status: {}", health.status);
            println!("System available: {}", health.system_available);
            println!("Reported at: {}", health.timestamp);
            Ok(())
        }
        Err(e) => anyhow::bail!("Transcription service unreachable: {e}"),
    }
}

/// Resolve a `--keep-audio` path; a bare filename lands in the
/// recordings directory.
fn resolve_keep_path(path: PathBuf) -> Result<PathBuf> {
    if path.components().count() > 1 || path.is_absolute() {
        return Ok(path);
    }
    Ok(dirs::recordings_dir()?.join(path))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
