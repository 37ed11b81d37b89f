//! Remote OCR HTTP backend
//!
//! Uploads the frame as a data URL in a multipart form and reads the
//! parsed text from the JSON response.

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{OcrBackend, ProcessedImage, ProgressSink};
use crate::config::RemoteSettings;
use crate::error::OcrError;

/// Hosted OCR service client
pub struct RemoteOcr {
    client: reqwest::Client,
    settings: RemoteSettings,
    api_key: String,
    language: String,
}

impl RemoteOcr {
    /// Create a new client; fails when no API key is configured
    pub fn new(settings: &RemoteSettings, language: &str, timeout: Duration) -> Result<Self, OcrError> {
        let api_key = settings
            .resolved_api_key()
            .ok_or_else(|| OcrError::BackendUnavailable("no API key configured for the OCR service".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::BackendUnavailable(format!("failed to create HTTP client: {}", e)))?;

        info!("Using remote OCR service at {}", settings.endpoint);

        Ok(Self {
            client,
            settings: settings.clone(),
            api_key,
            language: language.to_string(),
        })
    }

    /// Multipart form fields for one image
    fn form_fields(&self, data_url: String) -> Vec<(&'static str, String)> {
        vec![
            ("base64Image", data_url),
            ("language", self.language.clone()),
            ("isOverlayRequired", self.settings.overlay_required.to_string()),
            ("detectOrientation", self.settings.detect_orientation.to_string()),
            ("scale", self.settings.scale.to_string()),
            ("OCREngine", self.settings.engine.to_string()),
        ]
    }
}

#[async_trait]
impl OcrBackend for RemoteOcr {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn recognize(&self, image: &ProcessedImage, progress: &ProgressSink) -> Result<String, OcrError> {
        let data_url = image.to_data_url()?;
        debug!("Remote OCR: uploading data URL of {} bytes", data_url.len());

        let form = self
            .form_fields(data_url)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        progress.report("uploading frame", None);

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("apikey", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OcrError::RecognitionFailed(format!(
                "OCR service returned status {}",
                response.status()
            )));
        }

        progress.report("reading response", Some(1.0));

        let body: RemoteResponse = response
            .json()
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("invalid response: {}", e)))?;

        body.into_text()
    }
}

/// Response body of the OCR service
#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(rename = "OCRExitCode")]
    exit_code: i64,
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

impl RemoteResponse {
    /// Exit code 1 means every page was parsed
    fn into_text(self) -> Result<String, OcrError> {
        if self.exit_code != 1 {
            let message = match self.error_message {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => format!("OCR service exit code {}", self.exit_code),
            };
            return Err(OcrError::RecognitionFailed(message));
        }

        Ok(self
            .parsed_results
            .into_iter()
            .next()
            .map(|r| r.parsed_text)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, OcrError> {
        serde_json::from_str::<RemoteResponse>(json).unwrap().into_text()
    }

    fn settings_with_key() -> RemoteSettings {
        RemoteSettings {
            api_key: Some("test-key".to_string()),
            ..RemoteSettings::default()
        }
    }

    #[test]
    fn test_success_response() {
        let json = r#"{"ParsedResults":[{"ParsedText":"Hello\r\nWorld","FileParseExitCode":1}],"OCRExitCode":1,"IsErroredOnProcessing":false}"#;
        assert_eq!(parse(json).unwrap(), "Hello\r\nWorld");
    }

    #[test]
    fn test_success_without_results_is_empty() {
        assert_eq!(parse(r#"{"OCRExitCode":1}"#).unwrap(), "");
    }

    #[test]
    fn test_error_message_array() {
        let json = r#"{"OCRExitCode":3,"IsErroredOnProcessing":true,"ErrorMessage":["E101: Timed out","Try again"]}"#;
        assert_eq!(
            parse(json).unwrap_err(),
            OcrError::RecognitionFailed("E101: Timed out; Try again".to_string())
        );
    }

    #[test]
    fn test_error_without_message() {
        assert_eq!(
            parse(r#"{"OCRExitCode":4}"#).unwrap_err(),
            OcrError::RecognitionFailed("OCR service exit code 4".to_string())
        );
    }

    #[test]
    fn test_requires_api_key() {
        let settings = RemoteSettings {
            api_key: None,
            ..RemoteSettings::default()
        };
        std::env::remove_var(crate::config::API_KEY_ENV);
        let result = RemoteOcr::new(&settings, "eng", Duration::from_secs(5));
        assert!(matches!(result, Err(OcrError::BackendUnavailable(_))));
    }

    #[test]
    fn test_form_fields() {
        let ocr = RemoteOcr::new(&settings_with_key(), "eng", Duration::from_secs(5)).unwrap();
        let fields = ocr.form_fields("data:image/png;base64,AAAA".to_string());
        let names: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["base64Image", "language", "isOverlayRequired", "detectOrientation", "scale", "OCREngine"]
        );
        assert_eq!(fields[0].1, "data:image/png;base64,AAAA");
        assert_eq!(fields[1].1, "eng");
        assert_eq!(fields[2].1, "false");
        assert_eq!(fields[5].1, "2");
    }
}
