use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::model::time::TimeOfDay;

/// One entry of the ordered time pattern list.
#[derive(Debug, Clone, Copy)]
pub struct TimePattern {
    pub name: &'static str,
    pub regex: &'static str,
    pub has_seconds: bool,
    pub has_meridiem: bool,
}

/// Time patterns, evaluated top to bottom. The first pattern with a valid
/// match wins, so the more specific forms must come first: `6:47:27 AM`
/// would otherwise be read as `6:47`.
///
/// Capture groups: 1 = hour, 2 = minute, 3 = second (if any), last = AM/PM (if any).
pub const TIME_PATTERNS: [TimePattern; 4] = [
    TimePattern {
        name: "12h-seconds",
        regex: r"\b(\d{1,2}):(\d{2}):(\d{2})\s*([AaPp][Mm])\b",
        has_seconds: true,
        has_meridiem: true,
    },
    TimePattern {
        name: "12h",
        regex: r"\b(\d{1,2}):(\d{2})\s*([AaPp][Mm])\b",
        has_seconds: false,
        has_meridiem: true,
    },
    TimePattern {
        name: "24h-seconds",
        regex: r"\b(\d{1,2}):(\d{2}):(\d{2})\b",
        has_seconds: true,
        has_meridiem: false,
    },
    TimePattern {
        name: "24h",
        regex: r"\b(\d{1,2}):(\d{2})\b",
        has_seconds: false,
        has_meridiem: false,
    },
];

static COMPILED: LazyLock<Vec<(TimePattern, Regex)>> = LazyLock::new(|| {
    TIME_PATTERNS
        .iter()
        .filter_map(|p| match Regex::new(p.regex) {
            Ok(re) => Some((*p, re)),
            Err(e) => {
                log::error!("Invalid time pattern {}: {}", p.name, e);
                None
            }
        })
        .collect()
});

/// A time found in recognized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeMatch {
    pub time: TimeOfDay,
    /// The substring that matched, e.g. `6:47:27 AM`.
    pub span: String,
    pub pattern: &'static str,
}

/// Finds the highest-priority time in `text`.
///
/// Candidates with out-of-range values are skipped rather than clamped, and
/// the search continues with later candidates and lower-priority patterns.
/// A rejected candidate only consumes its first character, so candidates
/// overlapping it are still found (`99:12:30` yields `12:30`).
pub fn find_time(text: &str) -> Option<TimeMatch> {
    for (pattern, regex) in COMPILED.iter() {
        let mut start = 0;
        while let Some(caps) = regex.captures_at(text, start) {
            let Some(whole) = caps.get(0) else { break };
            if let Some(time) = parse_captures(pattern, &caps) {
                log::debug!("Time pattern {} matched '{}' -> {}", pattern.name, whole.as_str(), time);
                return Some(TimeMatch {
                    time,
                    span: whole.as_str().to_string(),
                    pattern: pattern.name,
                });
            }
            let step = text[whole.start()..].chars().next().map_or(1, char::len_utf8);
            start = whole.start() + step;
        }
    }
    None
}

fn parse_captures(pattern: &TimePattern, caps: &Captures) -> Option<TimeOfDay> {
    let number = |idx: usize| -> Option<u32> { caps.get(idx)?.as_str().parse().ok() };

    let hour = number(1)?;
    let minute = number(2)?;
    let second = if pattern.has_seconds { Some(number(3)?) } else { None };

    if pattern.has_meridiem {
        let meridiem_idx = if pattern.has_seconds { 4 } else { 3 };
        let pm = caps.get(meridiem_idx)?.as_str().eq_ignore_ascii_case("pm");
        TimeOfDay::from_12h(hour, minute, second, pm)
    } else {
        TimeOfDay::new(hour, minute, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(text: &str) -> (TimeOfDay, String) {
        let m = find_time(text).unwrap_or_else(|| panic!("no match in {:?}", text));
        (m.time, m.span)
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED.len(), TIME_PATTERNS.len());
    }

    #[test]
    fn test_prefers_12h_with_seconds() {
        let (time, span) = found("Time: 6:47:27 AM on the wall");
        assert_eq!(time, TimeOfDay::new(6, 47, Some(27)).unwrap());
        assert_eq!(span, "6:47:27 AM");
    }

    #[test]
    fn test_12h_without_seconds() {
        let (time, span) = found("11:05 PM");
        assert_eq!(time, TimeOfDay::hm(23, 5).unwrap());
        assert_eq!(span, "11:05 PM");

        let (time, _) = found("12:10AM");
        assert_eq!(time, TimeOfDay::hm(0, 10).unwrap());

        let (time, _) = found("12:10 PM");
        assert_eq!(time, TimeOfDay::hm(12, 10).unwrap());
    }

    #[test]
    fn test_24h_with_seconds() {
        let (time, span) = found("CAM1 18:02:55");
        assert_eq!(time, TimeOfDay::new(18, 2, Some(55)).unwrap());
        assert_eq!(span, "18:02:55");
    }

    #[test]
    fn test_leading_zero_stays_morning() {
        let (time, _) = found("06:47");
        assert_eq!(time, TimeOfDay::hm(6, 47).unwrap());
        assert_eq!(find_time("06:47").unwrap().pattern, "24h");
    }

    #[test]
    fn test_out_of_range_is_not_a_match() {
        assert!(find_time("25:99").is_none());
        assert!(find_time("12:60").is_none());
        assert!(find_time("23:59:60").is_some()); // falls back to 23:59
        assert_eq!(find_time("23:59:60").unwrap().time, TimeOfDay::hm(23, 59).unwrap());
    }

    #[test]
    fn test_skips_invalid_candidate_for_later_one() {
        let (time, span) = found("25:99 7:15");
        assert_eq!(time, TimeOfDay::hm(7, 15).unwrap());
        assert_eq!(span, "7:15");
    }

    #[test]
    fn test_finds_candidate_overlapping_a_rejected_one() {
        let m = find_time("99:12:30").unwrap();
        assert_eq!(m.time, TimeOfDay::hm(12, 30).unwrap());
        assert_eq!(m.span, "12:30");
        assert_eq!(m.pattern, "24h");

        let (time, span) = found("99:12:30 PM");
        assert_eq!(time, TimeOfDay::hm(12, 30).unwrap());
        assert_eq!(span, "12:30 PM");
    }

    #[test]
    fn test_invalid_12h_hour_falls_back_to_24h() {
        // "13:05 PM" is not a valid 12-hour time, but "13:05" is a valid 24-hour one
        let m = find_time("13:05 PM").unwrap();
        assert_eq!(m.time, TimeOfDay::hm(13, 5).unwrap());
        assert_eq!(m.pattern, "24h");
    }

    #[test]
    fn test_digits_must_be_bounded() {
        assert!(find_time("123:456").is_none());
        assert!(find_time("1:2").is_none());
        assert!(find_time("no clock here").is_none());
    }
}
