//! Process-wide recognition engine handle.
//!
//! The engine is created lazily on first use and reused afterwards. The slot
//! lock is held across creation, so concurrent first callers wait for the one
//! in-flight initialization instead of starting their own. A failed
//! initialization leaves the slot empty and the next caller retries.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use super::engine::{RecognizerFactory, TesseractFactory, TextRecognizer};
use crate::config::ExtractorConfig;

static GLOBAL_ENGINE: OnceLock<Arc<SharedEngine>> = OnceLock::new();

pub struct SharedEngine {
    factory: Box<dyn RecognizerFactory>,
    slot: Mutex<Option<Arc<dyn TextRecognizer>>>,
    init_count: AtomicUsize,
}

impl SharedEngine {
    pub fn new(factory: impl RecognizerFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            slot: Mutex::new(None),
            init_count: AtomicUsize::new(0),
        }
    }

    /// Returns the recognizer, creating it on first use.
    pub async fn recognizer(&self) -> Result<Arc<dyn TextRecognizer>> {
        let mut slot = self.slot.lock().await;
        if let Some(recognizer) = slot.as_ref() {
            return Ok(Arc::clone(recognizer));
        }

        let attempt = self.init_count.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Initializing recognition engine (attempt {})", attempt);

        let recognizer = self.factory.create().await?;
        *slot = Some(Arc::clone(&recognizer));
        Ok(recognizer)
    }

    /// Releases the recognizer. The next call to [`recognizer`](Self::recognizer)
    /// initializes a fresh one. Recognitions already in flight keep their own
    /// handle and finish normally.
    pub async fn terminate(&self) {
        let taken = self.slot.lock().await.take();
        if let Some(recognizer) = taken {
            recognizer.shutdown().await;
            log::info!("Recognition engine terminated");
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Number of initializations started so far, failed ones included.
    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }
}

/// The process-wide engine backed by Tesseract.
///
/// The configuration of the first caller is used; later calls share that engine.
pub fn global_engine(config: &ExtractorConfig) -> Arc<SharedEngine> {
    GLOBAL_ENGINE
        .get_or_init(|| Arc::new(SharedEngine::new(TesseractFactory::new(config.clone()))))
        .clone()
}

/// Tears down the process-wide engine if it was ever created.
pub async fn terminate_global_engine() {
    if let Some(engine) = GLOBAL_ENGINE.get() {
        engine.terminate().await;
    }
}
