//! OCR backend initialization
//!
//! Backends are created from an ordered list of strategies. Each strategy
//! either yields a ready backend or a typed failure; the first success wins.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::langdata::DownloadProgressCallback;
use super::{LanguageDataManager, OcrBackend, ProgressSink, RemoteOcr, TesseractOcr};
use crate::config::OcrSettings;
use crate::error::OcrError;
use crate::vision::BackendKind;

/// Name of the Tesseract executable looked up on PATH
const DEFAULT_TESSERACT: &str = "tesseract";

/// Creates the OCR backend on first use
#[async_trait]
pub trait BackendLoader: Send + Sync {
    /// Build and warm up a backend
    async fn load(&self, progress: &ProgressSink) -> Result<Arc<dyn OcrBackend>, OcrError>;
}

/// One way of bringing up a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStrategy {
    /// Tesseract executable with an optional tessdata directory
    Tesseract {
        binary: PathBuf,
        tessdata_dir: Option<PathBuf>,
    },
    /// Tesseract using language data downloaded into the data directory
    TesseractWithDownloadedData { binary: PathBuf },
    /// Hosted OCR service
    Remote,
}

/// Tries each strategy in order
pub struct StrategyLoader {
    strategies: Vec<InitStrategy>,
    settings: OcrSettings,
}

impl StrategyLoader {
    /// Build the strategy list for the configured backend
    pub fn from_settings(settings: &OcrSettings) -> Self {
        let strategies = match settings.backend {
            BackendKind::Local => {
                let local = &settings.local;
                let mut strategies = Vec::new();
                if let Some(binary) = &local.binary {
                    strategies.push(InitStrategy::Tesseract {
                        binary: binary.clone(),
                        tessdata_dir: local.tessdata_dir.clone(),
                    });
                }
                strategies.push(InitStrategy::Tesseract {
                    binary: PathBuf::from(DEFAULT_TESSERACT),
                    tessdata_dir: local.tessdata_dir.clone(),
                });
                if local.download_language_data {
                    strategies.push(InitStrategy::TesseractWithDownloadedData {
                        binary: local
                            .binary
                            .clone()
                            .unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT)),
                    });
                }
                strategies
            }
            BackendKind::Remote => vec![InitStrategy::Remote],
        };

        Self {
            strategies,
            settings: settings.clone(),
        }
    }

    /// Get the strategies in the order they are tried
    pub fn strategies(&self) -> &[InitStrategy] {
        &self.strategies
    }

    async fn try_strategy(
        &self,
        strategy: &InitStrategy,
        progress: &ProgressSink,
    ) -> Result<Arc<dyn OcrBackend>, OcrError> {
        let language = &self.settings.language;
        match strategy {
            InitStrategy::Tesseract { binary, tessdata_dir } => {
                let engine = TesseractOcr::new(binary, language, tessdata_dir.as_deref()).await?;
                Ok(Arc::new(engine))
            }
            InitStrategy::TesseractWithDownloadedData { binary } => {
                let manager = LanguageDataManager::new()
                    .map_err(|e| OcrError::BackendUnavailable(format!("{:#}", e)))?;

                let sink = progress.clone();
                let callback: DownloadProgressCallback = Box::new(move |downloaded, total| {
                    let fraction = total
                        .filter(|t| *t > 0)
                        .map(|t| downloaded as f32 / t as f32);
                    sink.report("downloading language data", fraction);
                });

                info!("Using language data in {:?}", manager.tessdata_dir());
                let tessdata_dir = manager
                    .ensure_language(language, Some(callback))
                    .await
                    .map_err(|e| OcrError::BackendUnavailable(format!("{:#}", e)))?;
                let engine = TesseractOcr::new(binary, language, Some(tessdata_dir.as_path())).await?;
                Ok(Arc::new(engine))
            }
            InitStrategy::Remote => {
                let client = RemoteOcr::new(&self.settings.remote, language, self.settings.timeout())?;
                Ok(Arc::new(client))
            }
        }
    }
}

#[async_trait]
impl BackendLoader for StrategyLoader {
    async fn load(&self, progress: &ProgressSink) -> Result<Arc<dyn OcrBackend>, OcrError> {
        let mut failures = Vec::new();
        debug!("Trying {} OCR init strategies", self.strategies().len());

        for strategy in self.strategies() {
            match self.try_strategy(strategy, progress).await {
                Ok(backend) => {
                    info!("OCR backend '{}' ready via {:?}", backend.name(), strategy);
                    return Ok(backend);
                }
                Err(e) => {
                    warn!("OCR init strategy {:?} failed: {}", strategy, e);
                    failures.push(e.to_string());
                }
            }
        }

        Err(OcrError::BackendUnavailable(if failures.is_empty() {
            "no initialization strategy configured".to_string()
        } else {
            failures.join("; ")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocalSettings, RemoteSettings};

    #[test]
    fn test_local_strategy_order() {
        let settings = OcrSettings {
            local: LocalSettings {
                binary: Some(PathBuf::from("/opt/tesseract/bin/tesseract")),
                tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
                download_language_data: true,
            },
            ..OcrSettings::default()
        };
        let loader = StrategyLoader::from_settings(&settings);

        assert_eq!(
            loader.strategies(),
            &[
                InitStrategy::Tesseract {
                    binary: PathBuf::from("/opt/tesseract/bin/tesseract"),
                    tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
                },
                InitStrategy::Tesseract {
                    binary: PathBuf::from("tesseract"),
                    tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
                },
                InitStrategy::TesseractWithDownloadedData {
                    binary: PathBuf::from("/opt/tesseract/bin/tesseract"),
                },
            ]
        );
    }

    #[test]
    fn test_local_without_download() {
        let settings = OcrSettings {
            local: LocalSettings {
                download_language_data: false,
                ..LocalSettings::default()
            },
            ..OcrSettings::default()
        };
        let loader = StrategyLoader::from_settings(&settings);
        assert_eq!(loader.strategies().len(), 1);
    }

    #[test]
    fn test_remote_strategy() {
        let settings = OcrSettings {
            backend: BackendKind::Remote,
            ..OcrSettings::default()
        };
        assert_eq!(StrategyLoader::from_settings(&settings).strategies(), &[InitStrategy::Remote]);
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let settings = OcrSettings {
            local: LocalSettings {
                binary: Some(PathBuf::from("/nonexistent/tesseract")),
                tessdata_dir: None,
                download_language_data: false,
            },
            ..OcrSettings::default()
        };
        let loader = StrategyLoader {
            strategies: vec![InitStrategy::Tesseract {
                binary: PathBuf::from("/nonexistent/tesseract"),
                tessdata_dir: None,
            }],
            settings,
        };

        match loader.load(&ProgressSink::disabled()).await {
            Err(OcrError::BackendUnavailable(reason)) => {
                assert!(reason.contains("/nonexistent/tesseract"), "{}", reason);
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("nonexistent binary must not load"),
        }
    }

    #[tokio::test]
    async fn test_remote_with_key_loads() {
        let settings = OcrSettings {
            backend: BackendKind::Remote,
            remote: RemoteSettings {
                api_key: Some("test-key".to_string()),
                ..RemoteSettings::default()
            },
            ..OcrSettings::default()
        };
        let backend = StrategyLoader::from_settings(&settings)
            .load(&ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(backend.name(), "remote");
    }
}
