//! Photo timestamp extraction.
//!
//! [`TimestampExtractor::extract`] never fails: every problem resolves to an
//! [`ExtractionResult::Failure`] the caller can show and move past.
//!
//! The optical strategy cannot recover the photo's own date and reports the
//! current local date instead. Callers that need the real date of an old photo
//! should rely on the metadata strategy.

pub mod metadata;
pub mod patterns;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use image::GrayImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::model::time::TimeOfDay;
use crate::ocr::{self, prepare_for_ocr, SharedEngine};

pub use patterns::{find_time, TimeMatch, TIME_PATTERNS};

/// Which strategy produced a successful extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Metadata,
    Optical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No capture-time tag in the photo's metadata.
    NoMetadata,
    /// Text was recognized but contained no usable time.
    NoPatternMatch,
    /// Decoding or recognition failed; retrying the same photo is safe.
    ProcessingError,
}

impl FailureReason {
    /// Message suitable for showing to the person logging the shift.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::NoMetadata => "no capture time in photo metadata",
            FailureReason::NoPatternMatch => "could not detect a time; please enter manually",
            FailureReason::ProcessingError => "could not read the photo; please try again",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

/// Outcome of one extraction. Created per upload and consumed immediately.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success {
        time: TimeOfDay,
        date: NaiveDate,
        /// Full recognized text, or the raw metadata tag value.
        source_text: String,
        /// The part of `source_text` the time was read from.
        matched_span: String,
        source: ExtractionSource,
    },
    Failure {
        reason: FailureReason,
        /// Recognized text, kept for diagnostics when no time was found.
        raw_text: Option<String>,
    },
}

impl ExtractionResult {
    fn failure(reason: FailureReason, raw_text: Option<String>) -> Self {
        ExtractionResult::Failure { reason, raw_text }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    pub fn time(&self) -> Option<TimeOfDay> {
        match self {
            ExtractionResult::Success { time, .. } => Some(*time),
            ExtractionResult::Failure { .. } => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ExtractionResult::Success { date, .. } => Some(*date),
            ExtractionResult::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            ExtractionResult::Success { .. } => None,
            ExtractionResult::Failure { reason, .. } => Some(*reason),
        }
    }
}

/// Reads a clock time from a photo, via EXIF metadata or OCR.
pub struct TimestampExtractor {
    engine: Arc<SharedEngine>,
    config: ExtractorConfig,
}

impl TimestampExtractor {
    /// Uses the process-wide Tesseract engine.
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            engine: ocr::global_engine(&config),
            config,
        }
    }

    /// Uses the given engine instead of the process-wide one.
    pub fn with_engine(engine: Arc<SharedEngine>, config: ExtractorConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &Arc<SharedEngine> {
        &self.engine
    }

    /// Extracts a time from image bytes.
    ///
    /// With the metadata fast path enabled, an EXIF capture time is returned
    /// directly; otherwise, or when the photo has none, OCR runs.
    pub async fn extract(&self, image: &[u8]) -> ExtractionResult {
        if self.config.metadata_fast_path {
            let result = self.extract_metadata(image).await;
            if result.is_success() {
                return result;
            }
            log::debug!("No usable metadata, falling back to OCR");
        }
        self.extract_optical(image).await
    }

    /// Metadata strategy only.
    pub async fn extract_metadata(&self, image: &[u8]) -> ExtractionResult {
        let tags = match metadata::read_capture_tags(image) {
            Ok(tags) => tags,
            Err(e) => {
                log::debug!("Metadata read failed: {:#}", e);
                return ExtractionResult::failure(FailureReason::NoMetadata, None);
            }
        };

        match metadata::select_capture_time(&tags) {
            Some(capture) => {
                log::info!("Timestamp from metadata: {} {}", capture.date, capture.time);
                ExtractionResult::Success {
                    time: capture.time,
                    date: capture.date,
                    source_text: capture.raw.clone(),
                    matched_span: capture.raw,
                    source: ExtractionSource::Metadata,
                }
            }
            None => ExtractionResult::failure(FailureReason::NoMetadata, None),
        }
    }

    /// Optical strategy only.
    pub async fn extract_optical(&self, image: &[u8]) -> ExtractionResult {
        let text = match self.recognize_text(image).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("OCR failed: {:#}", e);
                return ExtractionResult::failure(FailureReason::ProcessingError, None);
            }
        };

        match find_time(&text) {
            Some(found) => {
                log::info!(
                    "Timestamp detected: {} (matched {:?} via {})",
                    found.time,
                    found.span,
                    found.pattern
                );
                ExtractionResult::Success {
                    time: found.time,
                    date: Local::now().date_naive(),
                    source_text: text,
                    matched_span: found.span,
                    source: ExtractionSource::Optical,
                }
            }
            None => {
                log::info!("No timestamp found in recognized text: {:?}", text);
                ExtractionResult::failure(FailureReason::NoPatternMatch, Some(text))
            }
        }
    }

    async fn recognize_text(&self, image: &[u8]) -> Result<String> {
        let gray = self.decode(image).await?;

        // Engine start-up counts against the limit too
        let timeout = Duration::from_millis(self.config.recognition_timeout_ms);
        tokio::time::timeout(timeout, async {
            let recognizer = self.engine.recognizer().await?;
            recognizer.recognize(&gray).await
        })
        .await
        .map_err(|_| anyhow!("Recognition timed out after {:?}", timeout))?
    }

    async fn decode(&self, image: &[u8]) -> Result<GrayImage> {
        let bytes = image.to_vec();
        let options = self.config.preprocess_options();
        tokio::task::spawn_blocking(move || -> Result<GrayImage> {
            let img = image::load_from_memory(&bytes).context("Failed to decode image")?;
            Ok(prepare_for_ocr(&img, &options))
        })
        .await
        .context("Image decode task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::shared::tests::CountingFactory;
    use exif::Tag;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::new(8, 8));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn optical_only() -> ExtractorConfig {
        ExtractorConfig {
            metadata_fast_path: false,
            ..ExtractorConfig::default()
        }
    }

    fn extractor(factory: CountingFactory, config: ExtractorConfig) -> TimestampExtractor {
        TimestampExtractor::with_engine(Arc::new(SharedEngine::new(factory)), config)
    }

    #[tokio::test]
    async fn test_optical_prefers_full_12h_pattern() {
        let ex = extractor(
            CountingFactory::returning("Time: 6:47:27 AM on the wall"),
            optical_only(),
        );

        let result = ex.extract(&png_bytes()).await;
        match result {
            ExtractionResult::Success {
                time,
                date,
                matched_span,
                source,
                ..
            } => {
                assert_eq!(time, TimeOfDay::new(6, 47, Some(27)).unwrap());
                assert_eq!(matched_span, "6:47:27 AM");
                assert_eq!(source, ExtractionSource::Optical);
                assert_eq!(date, Local::now().date_naive());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_optical_24h_leading_zero() {
        let ex = extractor(CountingFactory::returning("06:47"), optical_only());
        let result = ex.extract(&png_bytes()).await;
        assert_eq!(result.time(), TimeOfDay::hm(6, 47));
    }

    #[tokio::test]
    async fn test_no_pattern_match_keeps_raw_text() {
        let ex = extractor(CountingFactory::returning("25:99"), optical_only());
        let result = ex.extract(&png_bytes()).await;
        assert_eq!(
            result,
            ExtractionResult::Failure {
                reason: FailureReason::NoPatternMatch,
                raw_text: Some("25:99".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_undecodable_image_is_processing_error() {
        let factory = CountingFactory::returning("08:00");
        let created = Arc::clone(&factory.created);
        let ex = extractor(factory, optical_only());

        let result = ex.extract(b"definitely not an image").await;
        assert_eq!(result.failure_reason(), Some(FailureReason::ProcessingError));
        // Decoding fails before the engine is needed
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_is_processing_error() {
        let mut factory = CountingFactory::returning("08:00");
        factory.fail = true;
        let ex = extractor(factory, optical_only());

        let result = ex.extract(&png_bytes()).await;
        assert_eq!(
            result,
            ExtractionResult::Failure {
                reason: FailureReason::ProcessingError,
                raw_text: None,
            }
        );
    }

    #[tokio::test]
    async fn test_recognition_timeout_is_processing_error() {
        struct Stalled;

        #[async_trait::async_trait]
        impl crate::ocr::RecognizerFactory for Stalled {
            async fn create(&self) -> Result<Arc<dyn crate::ocr::TextRecognizer>> {
                Ok(Arc::new(Stalled))
            }
        }

        #[async_trait::async_trait]
        impl crate::ocr::TextRecognizer for Stalled {
            async fn recognize(&self, _image: &GrayImage) -> Result<String> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("08:00".to_string())
            }
        }

        let config = ExtractorConfig {
            recognition_timeout_ms: 20,
            ..optical_only()
        };
        let ex = TimestampExtractor::with_engine(Arc::new(SharedEngine::new(Stalled)), config);
        let result = ex.extract(&png_bytes()).await;
        assert_eq!(result.failure_reason(), Some(FailureReason::ProcessingError));
    }

    #[tokio::test]
    async fn test_slow_engine_start_up_is_bounded() {
        let mut factory = CountingFactory::returning("08:00");
        factory.delay = Duration::from_secs(3);
        let config = ExtractorConfig {
            recognition_timeout_ms: 50,
            ..optical_only()
        };
        let ex = extractor(factory, config);

        let started = std::time::Instant::now();
        let result = ex.extract(&png_bytes()).await;

        assert_eq!(result.failure_reason(), Some(FailureReason::ProcessingError));
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        // The abandoned start-up leaves no half-made engine behind
        assert!(!ex.engine().is_initialized().await);
    }

    #[tokio::test]
    async fn test_engine_initialized_once_across_extractions() {
        let factory = CountingFactory::returning("17:05");
        let created = Arc::clone(&factory.created);
        let ex = extractor(factory, optical_only());

        assert!(ex.extract(&png_bytes()).await.is_success());
        assert!(ex.extract(&png_bytes()).await.is_success());
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(ex.engine().init_count(), 1);
    }

    #[tokio::test]
    async fn test_metadata_fast_path_prefers_modification_time() {
        let factory = CountingFactory::returning("01:23");
        let created = Arc::clone(&factory.created);
        let ex = extractor(factory, ExtractorConfig::default());

        let jpeg = metadata::tests::jpeg_with_tags(&[
            (Tag::DateTime, "2024:05:01 17:30:05"),
            (Tag::DateTimeOriginal, "2024:05:01 08:02:00"),
            (Tag::DateTimeDigitized, "2024:05:01 08:02:01"),
        ]);
        let result = ex.extract(&jpeg).await;

        assert_eq!(result.time(), TimeOfDay::new(17, 30, Some(5)));
        assert_eq!(result.date(), NaiveDate::from_ymd_opt(2024, 5, 1));
        // OCR never ran
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_metadata_falls_back_to_ocr() {
        let ex = extractor(CountingFactory::returning("9:15 PM"), ExtractorConfig::default());

        assert_eq!(
            ex.extract_metadata(&png_bytes()).await.failure_reason(),
            Some(FailureReason::NoMetadata)
        );

        let result = ex.extract(&png_bytes()).await;
        assert_eq!(result.time(), TimeOfDay::hm(21, 15));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            FailureReason::NoPatternMatch.to_string(),
            "could not detect a time; please enter manually"
        );
    }
}
