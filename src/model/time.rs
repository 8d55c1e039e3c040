use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minutes in one day, used for overnight wraparound.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A wall-clock time without a date, always stored in 24-hour form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: Option<u8>,
}

impl TimeOfDay {
    /// Builds a time, returning `None` when any component is out of range.
    pub fn new(hour: u32, minute: u32, second: Option<u32>) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        let second = match second {
            Some(s) if s > 59 => return None,
            Some(s) => Some(s as u8),
            None => None,
        };
        Some(Self {
            hour: hour as u8,
            minute: minute as u8,
            second,
        })
    }

    /// Shorthand for an `HH:MM` time.
    pub fn hm(hour: u32, minute: u32) -> Option<Self> {
        Self::new(hour, minute, None)
    }

    /// Converts a 12-hour reading to 24-hour form.
    ///
    /// 12 AM becomes 0, 12 PM stays 12, PM adds 12 to hours 1 through 11.
    /// Hours outside 1..=12 are rejected.
    pub fn from_12h(hour: u32, minute: u32, second: Option<u32>, pm: bool) -> Option<Self> {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        Self::new(hour24, minute, second)
    }

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    pub fn second(&self) -> Option<u32> {
        self.second.map(u32::from)
    }

    /// Minutes since midnight. Seconds are ignored.
    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour() * 60 + self.minute()
    }

    /// Display form used by the entry list and proof image, e.g. `06:47 PM`.
    pub fn to_12h_string(&self) -> String {
        let period = if self.hour >= 12 { "PM" } else { "AM" };
        let hour = match self.hour {
            0 => 12,
            h if h > 12 => h - 12,
            h => h,
        };
        format!("{:02}:{:02} {}", hour, self.minute, period)
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        // Components are range-checked on construction.
        NaiveTime::from_hms_opt(self.hour(), self.minute(), self.second().unwrap_or(0))
            .unwrap_or(NaiveTime::MIN)
    }
}

/// `HH:MM`, the value format of a time input field.
impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parses `H:MM` or `H:MM:SS` in 24-hour form.
impl FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(anyhow!("Expected HH:MM or HH:MM:SS, got '{}'", s));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in &parts {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(anyhow!("Invalid time component '{}' in '{}'", part, s));
            }
            numbers.push(part.parse::<u32>()?);
        }

        TimeOfDay::new(numbers[0], numbers[1], numbers.get(2).copied())
            .ok_or_else(|| anyhow!("Time out of range: '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(TimeOfDay::new(24, 0, None).is_none());
        assert!(TimeOfDay::new(23, 60, None).is_none());
        assert!(TimeOfDay::new(23, 59, Some(60)).is_none());
        assert!(TimeOfDay::new(23, 59, Some(59)).is_some());
    }

    #[test]
    fn test_from_12h() {
        assert_eq!(TimeOfDay::from_12h(12, 0, None, false), TimeOfDay::hm(0, 0));
        assert_eq!(TimeOfDay::from_12h(12, 30, None, true), TimeOfDay::hm(12, 30));
        assert_eq!(TimeOfDay::from_12h(6, 47, Some(27), true), TimeOfDay::new(18, 47, Some(27)));
        assert_eq!(TimeOfDay::from_12h(6, 47, None, false), TimeOfDay::hm(6, 47));
        assert!(TimeOfDay::from_12h(0, 30, None, false).is_none());
        assert!(TimeOfDay::from_12h(13, 0, None, true).is_none());
    }

    #[test]
    fn test_parse() {
        let t: TimeOfDay = "09:05".parse().unwrap();
        assert_eq!(t, TimeOfDay::hm(9, 5).unwrap());

        let t: TimeOfDay = "7:30:15".parse().unwrap();
        assert_eq!(t.second(), Some(15));

        assert!("".parse::<TimeOfDay>().is_err());
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("12:5a".parse::<TimeOfDay>().is_err());
        assert!("12".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_display_formats() {
        let t = TimeOfDay::hm(0, 5).unwrap();
        assert_eq!(t.to_string(), "00:05");
        assert_eq!(t.to_12h_string(), "12:05 AM");
        assert_eq!(TimeOfDay::hm(12, 0).unwrap().to_12h_string(), "12:00 PM");
        assert_eq!(TimeOfDay::hm(13, 9).unwrap().to_12h_string(), "01:09 PM");
    }

    #[test]
    fn test_minutes_ignore_seconds() {
        let t = TimeOfDay::new(1, 2, Some(59)).unwrap();
        assert_eq!(t.minutes_since_midnight(), 62);
    }
}
