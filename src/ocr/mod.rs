//! Optical text recognition: preprocessing, the Tesseract backend and the
//! shared engine handle.

pub mod engine;
pub mod preprocess;
pub mod setup;
pub mod shared;

pub use engine::{
    OcrLine, OcrWord, RecognizerFactory, TesseractFactory, TesseractRecognizer, TextRecognizer,
};
pub use preprocess::{prepare_for_ocr, PreprocessOptions};
pub use setup::{ensure_tesseract, TesseractPaths};
pub use shared::{global_engine, terminate_global_engine, SharedEngine};
