//! Capture time from embedded EXIF metadata.
//!
//! Tags are checked in priority order: `DateTime` (last modification),
//! `DateTimeOriginal` (capture), `DateTimeDigitized`. The first tag that is
//! present and well-formed wins.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use exif::{In, Tag, Value};
use regex::Regex;
use std::io::Cursor;
use std::sync::LazyLock;

use crate::model::time::TimeOfDay;

/// EXIF date-time format: `YYYY:MM:DD HH:MM:SS`, seconds optional.
const EXIF_DATETIME_PATTERN: &str =
    r"^(\d{4}):(\d{2}):(\d{2})[ T](\d{2}):(\d{2})(?::(\d{2}))?";

static EXIF_DATETIME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(EXIF_DATETIME_PATTERN).ok());

/// Tags consulted, highest priority first.
const CAPTURE_TAGS: [Tag; 3] = [Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized];

/// Raw date-time tag values found in a photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureTags {
    pub modified: Option<String>,
    pub original: Option<String>,
    pub digitized: Option<String>,
}

impl CaptureTags {
    fn in_priority_order(&self) -> [Option<&str>; 3] {
        [
            self.modified.as_deref(),
            self.original.as_deref(),
            self.digitized.as_deref(),
        ]
    }
}

/// A capture time read from metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTime {
    pub date: NaiveDate,
    pub time: TimeOfDay,
    /// The tag value the time was parsed from.
    pub raw: String,
}

/// Reads the three date-time tags from an image container (JPEG, TIFF, PNG, WebP, HEIF).
///
/// Fails when the bytes are not a supported container or carry no EXIF block.
pub fn read_capture_tags(image: &[u8]) -> Result<CaptureTags> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(image))
        .context("No EXIF data in image")?;

    let mut values = CAPTURE_TAGS.iter().map(|tag| {
        exif.get_field(*tag, In::PRIMARY)
            .and_then(|field| ascii_value(&field.value))
    });

    Ok(CaptureTags {
        modified: values.next().flatten(),
        original: values.next().flatten(),
        digitized: values.next().flatten(),
    })
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts.first().map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        _ => None,
    }
}

/// Picks the highest-priority tag that parses as a date-time.
pub fn select_capture_time(tags: &CaptureTags) -> Option<CaptureTime> {
    tags.in_priority_order()
        .into_iter()
        .flatten()
        .find_map(|raw| {
            let parsed = parse_exif_datetime(raw);
            if parsed.is_none() {
                log::debug!("Skipping malformed EXIF date-time '{}'", raw);
            }
            parsed.map(|(date, time)| CaptureTime {
                date,
                time,
                raw: raw.to_string(),
            })
        })
}

/// Parses `YYYY:MM:DD HH:MM[:SS]`.
pub fn parse_exif_datetime(raw: &str) -> Option<(NaiveDate, TimeOfDay)> {
    let caps = EXIF_DATETIME.as_ref()?.captures(raw.trim())?;
    let number = |idx: usize| -> Option<u32> { caps.get(idx)?.as_str().parse().ok() };

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;
    let second = match caps.get(6) {
        Some(_) => Some(number(6)?),
        None => None,
    };
    let time = TimeOfDay::new(number(4)?, number(5)?, second)?;
    Some((date, time))
}
