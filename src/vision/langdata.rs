//! Tesseract language data management
//!
//! Handles downloading and caching of `<lang>.traineddata` files so the
//! local engine works without a system-wide tessdata installation.

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Environment variable disabling downloads
pub const OFFLINE_ENV: &str = "VIDEO_OCR_OFFLINE";

/// Base URL of the fast (integer) trained models
const TESSDATA_BASE_URL: &str = "https://github.com/tesseract-ocr/tessdata_fast/raw/main";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Smallest plausible traineddata file; anything shorter is a failed download
const MIN_TRAINEDDATA_BYTES: u64 = 100_000;

/// Progress callback for download operations: (downloaded, total)
pub type DownloadProgressCallback = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Manifest tracking downloaded language files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageManifest {
    pub languages: Vec<LanguageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub language: String,
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub downloaded_at: String,
}

/// Downloads and caches language data in a tessdata directory
pub struct LanguageDataManager {
    tessdata_dir: PathBuf,
}

impl LanguageDataManager {
    /// Create a manager using `<data dir>/tessdata`
    pub fn new() -> Result<Self> {
        let data_dir = crate::storage::get_data_dir()?;
        Self::with_dir(data_dir.join("tessdata"))
    }

    /// Create manager with custom directory
    pub fn with_dir(tessdata_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&tessdata_dir)
            .with_context(|| format!("Failed to create {:?}", tessdata_dir))?;
        Ok(Self { tessdata_dir })
    }

    /// Directory to pass as `--tessdata-dir`
    pub fn tessdata_dir(&self) -> &Path {
        &self.tessdata_dir
    }

    /// Path of the traineddata file for a language
    pub fn traineddata_path(&self, language: &str) -> PathBuf {
        self.tessdata_dir.join(format!("{}.traineddata", language))
    }

    /// Download URL of the traineddata file for a language
    pub fn download_url(language: &str) -> String {
        format!("{}/{}.traineddata", TESSDATA_BASE_URL, language)
    }

    /// Check if a language is already downloaded
    pub fn is_available(&self, language: &str) -> bool {
        std::fs::metadata(self.traineddata_path(language))
            .map(|m| m.len() >= MIN_TRAINEDDATA_BYTES)
            .unwrap_or(false)
    }

    /// Download a language if it is missing or fails verification.
    /// Returns the tessdata directory.
    pub async fn ensure_language(
        &self,
        language: &str,
        progress: Option<DownloadProgressCallback>,
    ) -> Result<PathBuf> {
        if self.is_available(language) {
            match self.verify(language)? {
                Checksum::Match | Checksum::Unrecorded => {
                    debug!("Language data for {} already available", language);
                    return Ok(self.tessdata_dir.clone());
                }
                Checksum::Mismatch => {
                    warn!("Language data for {} is corrupt, downloading again", language)
                }
            }
        }

        let url = Self::download_url(language);
        let path = self.traineddata_path(language);

        if std::env::var(OFFLINE_ENV).is_ok() {
            bail!(
                "Offline mode: cannot download language data. Please download {} and place it at {:?}",
                url,
                path
            );
        }

        info!("Downloading {} language data from {}", language, url);
        let streamed = download_file(&url, &path, progress).await?;

        let stored = file_sha256(&path)?;
        if stored != streamed || !self.is_available(language) {
            let _ = std::fs::remove_file(&path);
            bail!("Downloaded language data for {} failed verification", language);
        }

        self.record_download(language, &stored)?;
        info!("Successfully downloaded {} language data", language);
        Ok(self.tessdata_dir.clone())
    }

    /// Compare a language file against the checksum recorded at download time
    pub fn verify(&self, language: &str) -> Result<Checksum> {
        let manifest = self.load_manifest().unwrap_or_default();
        let Some(recorded) = manifest.languages.iter().find(|l| l.language == language) else {
            return Ok(Checksum::Unrecorded);
        };
        let actual = file_sha256(&self.traineddata_path(language))?;
        Ok(if actual == recorded.sha256 {
            Checksum::Match
        } else {
            Checksum::Mismatch
        })
    }

    /// Load the language manifest
    pub fn load_manifest(&self) -> Result<LanguageManifest> {
        let manifest_path = self.tessdata_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(LanguageManifest::default())
        }
    }

    /// Save the language manifest
    pub fn save_manifest(&self, manifest: &LanguageManifest) -> Result<()> {
        let manifest_path = self.tessdata_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }

    fn record_download(&self, language: &str, sha256: &str) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        let path = self.traineddata_path(language);

        let info = LanguageInfo {
            language: language.to_string(),
            filename: format!("{}.traineddata", language),
            size_bytes: std::fs::metadata(&path)?.len(),
            sha256: sha256.to_string(),
            downloaded_at: unix_timestamp(),
        };

        if let Some(existing) = manifest.languages.iter_mut().find(|l| l.language == language) {
            *existing = info;
        } else {
            manifest.languages.push(info);
        }

        self.save_manifest(&manifest)
    }
}

/// Outcome of checking a language file against the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// Installed by hand, nothing to compare with
    Unrecorded,
    Match,
    Mismatch,
}

/// Stream `url` into `path` via a `.part` file, returning the sha256 of
/// the received bytes
async fn download_file(
    url: &str,
    path: &Path,
    progress: Option<DownloadProgressCallback>,
) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("Failed to download {}", url))?;

    let total = response.content_length();
    let part_path = path.with_extension("part");
    let mut file = tokio::fs::File::create(&part_path)
        .await
        .with_context(|| format!("Failed to create {:?}", part_path))?;

    let mut hasher = Sha256::new();
    let mut received: u64 = 0;
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.context("Download interrupted")?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        received += chunk.len() as u64;
        if let Some(callback) = &progress {
            callback(received, total);
        }
    }
    file.sync_all().await?;
    drop(file);

    if let Some(expected) = total.filter(|t| *t != received) {
        let _ = tokio::fs::remove_file(&part_path).await;
        bail!("Download truncated: got {} of {} bytes", received, expected);
    }

    tokio::fs::rename(&part_path, path)
        .await
        .with_context(|| format!("Failed to move download to {:?}", path))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// sha256 of a file on disk, as lowercase hex
fn file_sha256(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn unix_timestamp() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    now.to_string()
}
