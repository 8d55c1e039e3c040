//! Extractor configuration.
//!
//! Loaded from a JSON file at startup. Every field has a default, so a partial
//! file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ocr::PreprocessOptions;
use crate::paths;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Try embedded EXIF capture time before running OCR
    pub metadata_fast_path: bool,
    /// Explicit path to the tesseract executable
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language, e.g. "eng" or "eng+osd"
    pub language: String,
    /// Tesseract page segmentation mode (11 = sparse text)
    pub page_seg_mode: u8,
    /// Characters Tesseract may emit; restricting it cuts false positives
    pub char_whitelist: String,
    /// Upper bound for a single recognition call (milliseconds)
    pub recognition_timeout_ms: u64,
    /// Images shorter than this are upscaled before OCR
    pub upscale_min_height: u32,
    /// Bright-pixel threshold for binarization; `None` keeps grayscale
    pub binarize_threshold: Option<u8>,
    /// Download missing language data into the local data dir
    pub auto_download_tessdata: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            metadata_fast_path: true,
            tesseract_path: None,
            tessdata_dir: None,
            language: "eng".to_string(),
            page_seg_mode: 11,
            char_whitelist: "0123456789: AMP".to_string(),
            recognition_timeout_ms: 30_000,
            upscale_min_height: 600,
            binarize_threshold: None,
            auto_download_tessdata: false,
        }
    }
}

impl ExtractorConfig {
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            upscale_min_height: self.upscale_min_height,
            binarize_threshold: self.binarize_threshold,
        }
    }
}

/// Loads configuration from `path`, or from config.json next to the
/// executable, falling back to defaults when the file is missing or invalid.
pub fn load_config(path: Option<&Path>) -> ExtractorConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::default_config_path);

    log::debug!("Looking for config at: {}", config_path.display());

    if !config_path.exists() {
        log::info!("{} not found. Using default config.", config_path.display());
        return ExtractorConfig::default();
    }

    match fs::read_to_string(&config_path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                log::info!("Config loaded from {}", config_path.display());
                config
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ExtractorConfig::default()
            }
        },
        Err(e) => {
            log::warn!(
                "Failed to read {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            ExtractorConfig::default()
        }
    }
}
