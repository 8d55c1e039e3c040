pub mod entry;
pub mod time;

pub use entry::{ClockSide, EntryIssue, ShiftEntry};
pub use time::TimeOfDay;
