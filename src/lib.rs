//! Shift Proof
//!
//! Reads the clock time off clock-in/clock-out photos (EXIF capture time or OCR
//! of a visible clock) and computes regular, overtime and total hours.

pub mod config;
pub mod extract;
pub mod hours;
pub mod logging;
pub mod model;
pub mod ocr;
pub mod paths;

pub use config::{load_config, ExtractorConfig};
pub use extract::{ExtractionResult, ExtractionSource, FailureReason, TimestampExtractor};
pub use hours::{compute, compute_from_fields, HoursBreakdown};
pub use model::{ClockSide, EntryIssue, ShiftEntry, TimeOfDay};
