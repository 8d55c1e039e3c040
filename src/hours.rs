//! Regular/overtime/total hours for a single shift.
//!
//! Regular hours are the elapsed time between clock-in and clock-out, wrapping
//! past midnight at most once. Overtime is never derived from elapsed time: the
//! manually entered value is authoritative and passed through unchanged. Whether
//! elapsed time beyond some threshold should count as overtime is an open
//! question; see DESIGN.md.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use crate::model::time::{TimeOfDay, MINUTES_PER_DAY};

/// Hours worked for one entry. `total_hours` is always
/// `regular_hours + overtime_hours`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursBreakdown {
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
}

impl HoursBreakdown {
    fn new(regular_hours: f64, overtime_hours: f64) -> Self {
        Self {
            regular_hours,
            overtime_hours,
            total_hours: regular_hours + overtime_hours,
        }
    }
}

impl Add for HoursBreakdown {
    type Output = HoursBreakdown;

    fn add(self, rhs: HoursBreakdown) -> HoursBreakdown {
        HoursBreakdown::new(
            self.regular_hours + rhs.regular_hours,
            self.overtime_hours + rhs.overtime_hours,
        )
    }
}

/// Summary across entries: total regular, total overtime, grand total.
impl Sum for HoursBreakdown {
    fn sum<I: Iterator<Item = HoursBreakdown>>(iter: I) -> Self {
        iter.fold(HoursBreakdown::default(), Add::add)
    }
}

impl fmt::Display for HoursBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "regular {:.2}h, overtime {:.2}h, total {:.2}h",
            self.regular_hours, self.overtime_hours, self.total_hours
        )
    }
}

/// Computes the hours for a shift.
///
/// If either time is absent, regular hours are 0 and the total is the manual
/// overtime. A clock-out earlier than the clock-in is treated as the next day.
/// Seconds are ignored.
///
/// Precondition: `manual_overtime_hours >= 0`. Callers reject negative input;
/// the value is used as given.
pub fn compute(
    time_in: Option<TimeOfDay>,
    time_out: Option<TimeOfDay>,
    manual_overtime_hours: f64,
) -> HoursBreakdown {
    let (Some(time_in), Some(time_out)) = (time_in, time_out) else {
        return HoursBreakdown::new(0.0, manual_overtime_hours);
    };

    let in_minutes = time_in.minutes_since_midnight();
    let mut out_minutes = time_out.minutes_since_midnight();
    if out_minutes < in_minutes {
        out_minutes += MINUTES_PER_DAY;
    }

    let regular_hours = (out_minutes - in_minutes) as f64 / 60.0;
    HoursBreakdown::new(regular_hours, manual_overtime_hours)
}

/// Computes hours from raw time-field values.
///
/// Empty or malformed fields count as absent, so a half-filled form still
/// yields the manual overtime.
pub fn compute_from_fields(time_in: &str, time_out: &str, manual_overtime_hours: f64) -> HoursBreakdown {
    compute(
        time_in.parse().ok(),
        time_out.parse().ok(),
        manual_overtime_hours,
    )
}
