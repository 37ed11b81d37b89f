//! Video Frame OCR - extract text from the current frame of a video
//!
//! Captures the frame a video is currently presenting, turns it into a
//! high-contrast black/white image and runs text recognition on it.

mod app;
mod capture;
mod config;
mod display;
mod error;
mod relay;
mod shared;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::OcrApp;
use crate::capture::{Document, PageManifest, StillVideo};
use crate::config::AppConfig;
use crate::display::{ConsoleDisplay, DisplayOptions};
use crate::shared::DisplayState;
use crate::storage::LastTextStore;
use crate::vision::{BackendKind, EncodeFormat};

/// Video Frame OCR - extract text from a paused video frame
#[derive(Parser, Debug)]
#[command(name = "video-frame-ocr", version)]
#[command(about = "Capture the current video frame and extract its text")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the text of a video frame
    Capture {
        /// Image file holding the frame the video presents
        #[arg(conflicts_with = "page")]
        image: Option<PathBuf>,

        /// TOML page description with videos in frames and shadow roots
        #[arg(long)]
        page: Option<PathBuf>,

        /// Write the image handed to OCR to this PNG file
        #[arg(long)]
        save_frame: Option<PathBuf>,

        /// OCR backend to use
        #[arg(long, value_enum)]
        backend: Option<BackendKind>,

        /// Encoding of the image handed to the OCR backend
        #[arg(long, value_enum)]
        format: Option<EncodeFormat>,

        /// Print display messages as JSON lines
        #[arg(long)]
        json: bool,

        /// Also save the extracted text into this directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },
    /// Print the last extracted text
    Last,
    /// Forget the last extracted text
    Clear,
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match args.config {
        Some(path) => path,
        None => storage::get_config_dir()?.join("config.toml"),
    };

    match args.command {
        Command::Capture {
            image,
            page,
            save_frame,
            backend,
            format,
            json,
            save_dir,
        } => {
            let mut config = load_or_create_config(&config_path);
            if let Some(backend) = backend {
                config.ocr.backend = backend;
            }
            if let Some(format) = format {
                config.encoding.format = format;
            }
            let document = load_document(image.as_deref(), page.as_deref())?;
            run_capture(config, document, save_frame, DisplayOptions { json, save_dir }).await
        }
        Command::Last => {
            let text = LastTextStore::new()?.load()?;
            if text.is_empty() {
                println!("No text extracted yet");
            } else {
                println!("{}", text);
                println!("({})", DisplayState::with_text(text).char_count_label());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Clear => {
            let store = LastTextStore::new()?;
            store.clear()?;
            info!("Removed {:?}", store.path());
            println!("Text cleared");
            Ok(ExitCode::SUCCESS)
        }
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!("{:?} already exists (use --force to overwrite)", config_path);
            }
            config::save_config(&AppConfig::default(), &config_path)?;
            println!("Wrote {}", config_path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: &Path) -> AppConfig {
    if path.exists() {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("Ignoring invalid configuration {:?}: {:#}", path, e),
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Build the page to capture from a single image or a page description
fn load_document(image: Option<&Path>, page: Option<&Path>) -> Result<Document> {
    if let Some(path) = page {
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        return PageManifest::load(path)?.into_document(base_dir);
    }
    Ok(match image {
        Some(path) => Document::with_video(Arc::new(StillVideo::open(path)?)),
        None => Document::new(),
    })
}

/// Capture one frame and wait until the display has shown the outcome
async fn run_capture(
    config: AppConfig,
    document: Document,
    save_frame: Option<PathBuf>,
    options: DisplayOptions,
) -> Result<ExitCode> {
    let store = match LastTextStore::new() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Extracted text will not be persisted: {:#}", e);
            None
        }
    };
    let previous = store
        .as_ref()
        .and_then(|s| s.load().map_err(|e| warn!("Could not read last text: {:#}", e)).ok())
        .unwrap_or_default();

    let state = Arc::new(RwLock::new(DisplayState::with_text(previous)));
    state.write().begin_capture();

    let (tx, rx) = crossbeam_channel::unbounded();
    let display = ConsoleDisplay::new(state.clone(), store, options).spawn(rx);

    let app = OcrApp::new(&config, Arc::new(tx)).with_frame_dump(save_frame);
    let result = app.capture(&document).await;
    app.shutdown();
    // Dropping the app closes the display channel
    drop(app);

    tokio::task::spawn_blocking(move || display.join())
        .await
        .context("Display thread panicked")?
        .map_err(|_| anyhow::anyhow!("Display thread panicked"))?;

    Ok(match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}
