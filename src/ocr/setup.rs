use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::ExtractorConfig;
use crate::paths;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

/// Install locations checked after the local data dir and PATH.
const COMMON_EXECUTABLE_PATHS: [&str; 5] = [
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

const COMMON_TESSDATA_PATHS: [&str; 7] = [
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Ensures Tesseract and its language data are available.
///
/// Language data missing from every known location is downloaded into the
/// local data dir when `auto_download_tessdata` is set.
pub async fn ensure_tesseract(config: &ExtractorConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config).await?;

    let tessdata = match find_tessdata_dir(config) {
        Ok(dir) => dir,
        Err(e) if config.auto_download_tessdata => {
            log::info!("{}; downloading language data", e);
            let dir = paths::get_tesseract_dir().join("tessdata");
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for language in languages(&config.language) {
                if !has_traineddata(&dir, language) {
                    download_tessdata(&dir, language).await?;
                }
            }
            dir
        }
        Err(e) => return Err(e),
    };

    log::info!("Tesseract found at: {}", executable.display());
    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable: configured path, local data dir, PATH,
/// then common install locations.
pub async fn find_tesseract_executable(config: &ExtractorConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(anyhow!(
            "Configured tesseract_path does not exist: {}",
            path.display()
        ));
    }

    let local_exe = paths::get_tesseract_dir().join(TESSERACT_EXE);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if tesseract_version(Path::new(TESSERACT_EXE)).await.is_ok() {
        return Ok(PathBuf::from(TESSERACT_EXE));
    }

    COMMON_EXECUTABLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding every configured language.
pub fn find_tessdata_dir(config: &ExtractorConfig) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = &config.tessdata_dir {
        candidates.push(dir.clone());
    }
    candidates.push(paths::get_tesseract_dir().join("tessdata"));
    candidates.extend(COMMON_TESSDATA_PATHS.iter().map(PathBuf::from));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates
        .into_iter()
        .find(|dir| languages(&config.language).all(|lang| has_traineddata(dir, lang)))
        .ok_or_else(|| {
            anyhow!(
                "tessdata directory not found. Please ensure {}.traineddata is available.",
                config.language
            )
        })
}

/// Runs `tesseract --version` and returns the first line of its output.
pub async fn tesseract_version(executable: &Path) -> Result<String> {
    let output = Command::new(executable)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run {}", executable.display()))?;

    if !output.status.success() {
        return Err(anyhow!(
            "{} --version exited with {}",
            executable.display(),
            output.status
        ));
    }

    // Older builds print the version on stderr
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).to_string()
    };
    Ok(text.lines().next().unwrap_or_default().trim().to_string())
}

fn languages(list: &str) -> impl Iterator<Item = &str> {
    list.split('+').map(str::trim).filter(|l| !l.is_empty())
}

fn has_traineddata(dir: &Path, language: &str) -> bool {
    dir.join(format!("{}.traineddata", language)).exists()
}

/// Downloads trained data for one language from the tessdata repository.
async fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, language);
    let target = tessdata_dir.join(format!("{}.traineddata", language));

    log::info!("Downloading {}.traineddata...", language);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "shiftproof")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            language,
            response.status()
        ));
    }

    let bytes = response.bytes().await?;
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    log::info!(
        "Downloaded {}.traineddata ({} bytes)",
        language,
        bytes.len()
    );

    Ok(())
}
