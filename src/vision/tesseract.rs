//! Local Tesseract backend
//!
//! Drives the `tesseract` executable, streaming the encoded frame through
//! stdin and reading the recognized text from stdout. The engine is probed
//! once when the backend is created and reused for every request.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{OcrBackend, ProcessedImage, ProgressSink};
use crate::error::OcrError;

/// Tesseract engine wrapper
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractOcr {
    /// Probe the executable and check that `language` is installed
    pub async fn new(
        binary: &Path,
        language: &str,
        tessdata_dir: Option<&Path>,
    ) -> Result<Self, OcrError> {
        info!("Initializing Tesseract from {:?} with language: {}", binary, language);

        let version_output = Command::new(binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| OcrError::BackendUnavailable(format!("cannot run {:?}: {}", binary, e)))?;
        if !version_output.status.success() {
            return Err(OcrError::BackendUnavailable(format!(
                "{:?} --version exited with {}",
                binary, version_output.status
            )));
        }
        // Older releases print the version banner on stderr
        let banner = if version_output.stdout.is_empty() {
            &version_output.stderr
        } else {
            &version_output.stdout
        };
        let version = String::from_utf8_lossy(banner)
            .lines()
            .next()
            .unwrap_or("tesseract")
            .trim()
            .to_string();

        let mut list_langs = Command::new(binary);
        if let Some(dir) = tessdata_dir {
            list_langs.arg("--tessdata-dir").arg(dir);
        }
        let langs_output = list_langs
            .arg("--list-langs")
            .output()
            .await
            .map_err(|e| OcrError::BackendUnavailable(format!("cannot list languages: {}", e)))?;
        let languages = parse_language_list(&String::from_utf8_lossy(&langs_output.stdout));
        if !languages.iter().any(|l| l == language) {
            return Err(OcrError::BackendUnavailable(format!(
                "language '{}' is not installed (available: {})",
                language,
                languages.join(", ")
            )));
        }

        info!("Tesseract initialized: {}", version);

        Ok(Self {
            binary: binary.to_path_buf(),
            language: language.to_string(),
            tessdata_dir: tessdata_dir.map(Path::to_path_buf),
        })
    }

    /// Arguments for one recognition run reading stdin and writing stdout
    fn recognize_args(&self) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
        ];
        if let Some(dir) = &self.tessdata_dir {
            args.push("--tessdata-dir".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }
        args
    }
}

#[async_trait]
impl OcrBackend for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(&self, image: &ProcessedImage, progress: &ProgressSink) -> Result<String, OcrError> {
        let (_, bytes) = image.compressed()?;
        let (width, height) = image.dimensions();
        debug!("Tesseract: Processing {}x{} image ({} bytes)", width, height, bytes.len());

        progress.report("recognizing text", Some(0.0));

        let mut child = Command::new(&self.binary)
            .args(self.recognize_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::RecognitionFailed(format!("cannot start tesseract: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::RecognitionFailed("tesseract stdin unavailable".to_string()))?;
        stdin
            .write_all(&bytes)
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("cannot send image: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::RecognitionFailed(
                stderr.lines().last().unwrap_or("tesseract exited with an error").to_string(),
            ));
        }

        progress.report("recognizing text", Some(1.0));

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Tesseract: recognized {} characters", text.len());
        Ok(text)
    }
}

/// Parse `tesseract --list-langs` output
fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\n\ndeu\n";
        assert_eq!(parse_language_list(output), vec!["eng", "osd", "deu"]);
    }

    #[test]
    fn test_recognize_args() {
        let engine = TesseractOcr {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            tessdata_dir: Some(PathBuf::from("/data/tessdata")),
        };
        assert_eq!(
            engine.recognize_args(),
            vec!["stdin", "stdout", "-l", "eng", "--tessdata-dir", "/data/tessdata"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let result = TesseractOcr::new(Path::new("/nonexistent/tesseract-binary"), "eng", None).await;
        assert!(matches!(result, Err(OcrError::BackendUnavailable(_))));
    }
}
