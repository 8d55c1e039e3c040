use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::time::TimeOfDay;
use crate::extract::ExtractionResult;
use crate::hours::{self, HoursBreakdown};

/// Which end of the shift a photo proves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSide {
    In,
    Out,
}

impl fmt::Display for ClockSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockSide::In => f.write_str("in"),
            ClockSide::Out => f.write_str("out"),
        }
    }
}

/// Something that keeps an entry from being recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryIssue {
    MissingTimeIn,
    MissingTimeOut,
    MissingTimeInPhoto,
    MissingTimeOutPhoto,
    MissingEmployeeName,
    NegativeOvertime,
}

impl fmt::Display for EntryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            EntryIssue::MissingTimeIn => "time in is missing",
            EntryIssue::MissingTimeOut => "time out is missing",
            EntryIssue::MissingTimeInPhoto => "time in photo is missing",
            EntryIssue::MissingTimeOutPhoto => "time out photo is missing",
            EntryIssue::MissingEmployeeName => "employee name is missing",
            EntryIssue::NegativeOvertime => "overtime cannot be negative",
        };
        f.write_str(msg)
    }
}

/// One shift being logged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShiftEntry {
    pub date: NaiveDate,
    pub employee_name: String,
    pub time_in: Option<TimeOfDay>,
    pub time_out: Option<TimeOfDay>,
    /// Photo proving the clock-in, e.g. a file path or upload id.
    pub time_in_photo: Option<String>,
    pub time_out_photo: Option<String>,
    pub manual_overtime_hours: f64,
}

impl Default for ShiftEntry {
    fn default() -> Self {
        Self {
            date: Local::now().date_naive(),
            employee_name: String::new(),
            time_in: None,
            time_out: None,
            time_in_photo: None,
            time_out_photo: None,
            manual_overtime_hours: 0.0,
        }
    }
}

impl ShiftEntry {
    pub fn new(employee_name: impl Into<String>) -> Self {
        Self {
            employee_name: employee_name.into(),
            ..Self::default()
        }
    }

    /// Attaches the photo for one side, whether or not a time was read from it.
    pub fn attach_photo(&mut self, side: ClockSide, photo: impl Into<String>) {
        let slot = match side {
            ClockSide::In => &mut self.time_in_photo,
            ClockSide::Out => &mut self.time_out_photo,
        };
        *slot = Some(photo.into());
    }

    /// Merges a successful extraction into the given side and the entry date.
    /// A failure leaves the entry untouched. Returns whether anything changed.
    pub fn apply_extraction(&mut self, side: ClockSide, result: &ExtractionResult) -> bool {
        let ExtractionResult::Success { time, date, .. } = result else {
            return false;
        };

        let slot = match side {
            ClockSide::In => &mut self.time_in,
            ClockSide::Out => &mut self.time_out,
        };
        let changed = *slot != Some(*time) || self.date != *date;
        *slot = Some(*time);
        self.date = *date;
        changed
    }

    pub fn hours(&self) -> HoursBreakdown {
        hours::compute(self.time_in, self.time_out, self.manual_overtime_hours)
    }

    /// Problems that must be fixed before the entry is recorded.
    pub fn validate(&self) -> Vec<EntryIssue> {
        let mut issues = Vec::new();
        if self.time_in.is_none() {
            issues.push(EntryIssue::MissingTimeIn);
        }
        if self.time_out.is_none() {
            issues.push(EntryIssue::MissingTimeOut);
        }
        if self.time_in_photo.is_none() {
            issues.push(EntryIssue::MissingTimeInPhoto);
        }
        if self.time_out_photo.is_none() {
            issues.push(EntryIssue::MissingTimeOutPhoto);
        }
        if self.employee_name.trim().is_empty() {
            issues.push(EntryIssue::MissingEmployeeName);
        }
        if self.manual_overtime_hours < 0.0 {
            issues.push(EntryIssue::NegativeOvertime);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractionSource, FailureReason};

    fn success(time: &str, date: NaiveDate) -> ExtractionResult {
        ExtractionResult::Success {
            time: time.parse().unwrap(),
            date,
            source_text: time.to_string(),
            matched_span: time.to_string(),
            source: ExtractionSource::Optical,
        }
    }

    #[test]
    fn test_success_fills_side_and_date() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mut entry = ShiftEntry::new("Sam");

        assert!(entry.apply_extraction(ClockSide::In, &success("08:05", day)));
        assert!(entry.apply_extraction(ClockSide::Out, &success("16:35", day)));

        assert_eq!(entry.time_in, TimeOfDay::hm(8, 5));
        assert_eq!(entry.time_out, TimeOfDay::hm(16, 35));
        assert_eq!(entry.date, day);
        assert_eq!(entry.hours().regular_hours, 8.5);

        entry.attach_photo(ClockSide::In, "in.jpg");
        entry.attach_photo(ClockSide::Out, "out.jpg");
        assert!(entry.validate().is_empty());
    }

    #[test]
    fn test_failure_leaves_entry_unchanged() {
        let mut entry = ShiftEntry::new("Sam");
        entry.time_in = TimeOfDay::hm(9, 0);
        let before = entry.clone();

        let failure = ExtractionResult::Failure {
            reason: FailureReason::NoPatternMatch,
            raw_text: Some("???".to_string()),
        };
        assert!(!entry.apply_extraction(ClockSide::In, &failure));
        assert_eq!(entry, before);
    }

    #[test]
    fn test_reapplying_same_result_reports_no_change() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut entry = ShiftEntry::new("Sam");
        let result = success("07:00", day);

        assert!(entry.apply_extraction(ClockSide::In, &result));
        assert!(!entry.apply_extraction(ClockSide::In, &result));
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let entry = ShiftEntry {
            manual_overtime_hours: -1.0,
            ..ShiftEntry::new("  ")
        };
        assert_eq!(
            entry.validate(),
            vec![
                EntryIssue::MissingTimeIn,
                EntryIssue::MissingTimeOut,
                EntryIssue::MissingTimeInPhoto,
                EntryIssue::MissingTimeOutPhoto,
                EntryIssue::MissingEmployeeName,
                EntryIssue::NegativeOvertime,
            ]
        );
    }

    #[test]
    fn test_entry_needs_both_photos() {
        let mut entry = ShiftEntry {
            time_in: TimeOfDay::hm(9, 0),
            time_out: TimeOfDay::hm(17, 0),
            ..ShiftEntry::new("Sam")
        };
        assert_eq!(
            entry.validate(),
            vec![EntryIssue::MissingTimeInPhoto, EntryIssue::MissingTimeOutPhoto]
        );

        entry.attach_photo(ClockSide::In, "in.jpg");
        assert_eq!(entry.validate(), vec![EntryIssue::MissingTimeOutPhoto]);
        assert_eq!(entry.time_in_photo.as_deref(), Some("in.jpg"));

        // A photo with no readable time still counts as evidence
        let failure = ExtractionResult::Failure {
            reason: FailureReason::NoPatternMatch,
            raw_text: None,
        };
        entry.apply_extraction(ClockSide::Out, &failure);
        entry.attach_photo(ClockSide::Out, "out.jpg");
        assert!(entry.validate().is_empty());
        assert_eq!(entry.time_out, TimeOfDay::hm(17, 0));
    }

    #[test]
    fn test_hours_with_missing_time_is_overtime_only() {
        let entry = ShiftEntry {
            time_out: TimeOfDay::hm(17, 0),
            manual_overtime_hours: 1.5,
            ..ShiftEntry::new("Sam")
        };
        let hours = entry.hours();
        assert_eq!(hours.regular_hours, 0.0);
        assert_eq!(hours.total_hours, 1.5);
    }
}
