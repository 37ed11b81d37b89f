//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::relay::AdmissionPolicy;
use crate::vision::encode::DEFAULT_JPEG_QUALITY;
use crate::vision::{BackendKind, EncodeFormat};

/// Environment variable overriding the remote OCR API key
pub const API_KEY_ENV: &str = "VIDEO_OCR_API_KEY";

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frame capture settings
    pub capture: CaptureSettings,
    /// Frame encoding settings
    pub encoding: EncodingSettings,
    /// OCR backend settings
    pub ocr: OcrSettings,
    /// Relay settings
    pub relay: RelaySettings,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Frames wider than this are scaled down
    pub max_width: u32,
    /// Frames taller than this are scaled down
    pub max_height: u32,
    /// Convert frames to black/white before encoding
    pub binarize: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            binarize: true,
        }
    }
}

impl CaptureSettings {
    /// Bounds for the frame sampler
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }
}

/// Encoding-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    /// Output format
    pub format: EncodeFormat,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            format: EncodeFormat::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// OCR backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Which backend recognizes text
    pub backend: BackendKind,
    /// Recognition language (Tesseract language code)
    pub language: String,
    /// Maximum time a single recognition may take
    pub timeout_secs: u64,
    /// Local engine settings
    pub local: LocalSettings,
    /// Remote service settings
    pub remote: RemoteSettings,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            language: "eng".to_string(),
            timeout_secs: 60,
            local: LocalSettings::default(),
            remote: RemoteSettings::default(),
        }
    }
}

impl OcrSettings {
    /// Recognition timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Local Tesseract settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Explicit path to the tesseract executable
    pub binary: Option<PathBuf>,
    /// Directory holding `<lang>.traineddata` files
    pub tessdata_dir: Option<PathBuf>,
    /// Download language data into the data directory when missing
    pub download_language_data: bool,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            binary: None,
            tessdata_dir: None,
            download_language_data: true,
        }
    }
}

/// Remote OCR service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Service endpoint
    pub endpoint: String,
    /// API key (falls back to the `VIDEO_OCR_API_KEY` environment variable)
    pub api_key: Option<String>,
    /// Service-side engine number
    pub engine: u8,
    /// Let the service upscale small images
    pub scale: bool,
    /// Let the service auto-rotate the image
    pub detect_orientation: bool,
    /// Request word overlay coordinates
    pub overlay_required: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.ocr.space/parse/image".to_string(),
            api_key: None,
            engine: 2,
            scale: true,
            detect_orientation: true,
            overlay_required: false,
        }
    }
}

impl RemoteSettings {
    /// API key from the config file or the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Relay settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// What happens to a capture issued while another is in flight
    pub admission: AdmissionPolicy,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
