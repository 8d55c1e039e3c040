use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::GrayImage;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;

use super::setup::{self, TesseractPaths};
use crate::config::ExtractorConfig;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Turns a preprocessed image into raw text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &GrayImage) -> Result<String>;

    /// Releases whatever the recognizer holds. Called once on engine teardown.
    async fn shutdown(&self) {}
}

/// Performs the expensive one-time setup of a recognizer.
#[async_trait]
pub trait RecognizerFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn TextRecognizer>>;
}

/// Recognizer backed by the Tesseract executable.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    paths: TesseractPaths,
    language: String,
    page_seg_mode: u8,
    char_whitelist: String,
}

impl TesseractRecognizer {
    pub fn new(paths: TesseractPaths, config: &ExtractorConfig) -> Self {
        Self {
            paths,
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
            char_whitelist: config.char_whitelist.clone(),
        }
    }

    /// Runs Tesseract on a preprocessed grayscale image.
    /// Returns structured output with lines and confidence scores.
    pub async fn recognize_lines(&self, img: &GrayImage) -> Result<Vec<OcrLine>> {
        let workspace = OcrWorkspace::new()?;

        let input_path = workspace.input_path();
        let owned = img.clone();
        tokio::task::spawn_blocking(move || owned.save(&input_path))
            .await
            .context("Image save task failed")?
            .context("Failed to write OCR input image")?;

        let output = Command::new(&self.paths.executable)
            .arg(workspace.input_path())
            .arg(workspace.output_base())
            .arg("--tessdata-dir")
            .arg(&self.paths.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.char_whitelist))
            .arg("tsv")
            .stdin(Stdio::null())
            .output()
            .await
            .context("Failed to run Tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let tsv_content = tokio::fs::read_to_string(workspace.tsv_path())
            .await
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;

        Ok(parse_tsv_output(&tsv_content))
    }
}

/// Scratch directory for one Tesseract run. Everything in it, including the
/// `.tsv` Tesseract writes next to the output base, is removed on drop.
struct OcrWorkspace {
    dir: TempDir,
}

impl OcrWorkspace {
    fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("shiftproof-ocr")
            .tempdir()
            .context("Failed to create OCR work directory")?;
        Ok(Self { dir })
    }

    fn input_path(&self) -> PathBuf {
        self.dir.path().join("input.png")
    }

    /// Tesseract appends the format extension to this path.
    fn output_base(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    fn tsv_path(&self) -> PathBuf {
        self.dir.path().join("output.tsv")
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &GrayImage) -> Result<String> {
        let lines = self.recognize_lines(image).await?;
        for line in &lines {
            log::debug!("OCR line: {:?} (conf: {:.0}%)", line.text, line.confidence);
        }
        Ok(lines_to_text(&lines))
    }

    async fn shutdown(&self) {
        log::info!(
            "Tesseract recognizer released ({})",
            self.paths.executable.display()
        );
    }
}

/// Creates [`TesseractRecognizer`]s from the extractor configuration.
pub struct TesseractFactory {
    config: ExtractorConfig,
}

impl TesseractFactory {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RecognizerFactory for TesseractFactory {
    async fn create(&self) -> Result<Arc<dyn TextRecognizer>> {
        let paths = setup::ensure_tesseract(&self.config).await?;
        let version = setup::tesseract_version(&paths.executable).await?;
        log::info!(
            "Tesseract {} ready (tessdata: {})",
            version,
            paths.tessdata.display()
        );
        Ok(Arc::new(TesseractRecognizer::new(paths, &self.config)))
    }
}

/// Joins recognized lines into the raw text used for pattern matching.
pub fn lines_to_text(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses Tesseract TSV output into structured OcrLine data
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let block_num: i32 = fields[2].parse().unwrap_or(-1);
        let par_num: i32 = fields[3].parse().unwrap_or(-1);
        let line_num: i32 = fields[4].parse().unwrap_or(-1);
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        // Line numbers restart per block and paragraph
        let key = (block_num, par_num, line_num);
        if current_key.is_some_and(|k| k != key) {
            push_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_key = Some(key);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    push_line(&mut lines, current_words);
    lines
}

fn push_line(lines: &mut Vec<OcrLine>, words: Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}
