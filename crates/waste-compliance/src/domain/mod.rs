//! Canonical record types shared by ingestion, the indicator engine and the
//! HTTP surface.

mod category;
mod records;
mod snapshot;

pub use category::{
    AreaCode, CategoryGroup, InspectionStatus, RequestStatus, ServiceCategory, ViolationStatus,
};
pub use records::{DeadlineOutcome, InspectionRecord, ServiceRequest, ViolationRecord};
pub use snapshot::{IndicatorKind, IndicatorSnapshot, StoredSnapshot};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Surrogate identifier assigned to every persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{:06}", self.0)
    }
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_record_id() -> RecordId {
    RecordId(RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Half-open reporting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportingWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ReportingWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window covering the whole calendar month that contains `date`.
    pub fn calendar_month(date: NaiveDate) -> Result<Self, WindowError> {
        let first = date.with_day(1).ok_or(WindowError::InvalidMonth)?;
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .ok_or(WindowError::InvalidMonth)?;

        let start = first.and_hms_opt(0, 0, 0).ok_or(WindowError::InvalidMonth)?;
        let end = next.and_hms_opt(0, 0, 0).ok_or(WindowError::InvalidMonth)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    pub fn intersects(&self, other: &ReportingWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("reporting window is empty: start {start} must precede end {end}")]
    Empty {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("reporting month is out of range")]
    InvalidMonth,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, day)
            .expect("valid date")
            .and_hms_opt(hour, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn window_is_half_open() {
        let window = ReportingWindow::new(at(1, 0), at(2, 0)).expect("window");
        assert!(window.contains(at(1, 0)));
        assert!(window.contains(at(1, 23)));
        assert!(!window.contains(at(2, 0)));
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        assert!(matches!(
            ReportingWindow::new(at(2, 0), at(1, 0)),
            Err(WindowError::Empty { .. })
        ));
        assert!(ReportingWindow::new(at(1, 0), at(1, 0)).is_err());
    }

    #[test]
    fn calendar_month_rolls_over_december() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 17).expect("valid date");
        let window = ReportingWindow::calendar_month(date).expect("window");
        assert_eq!(window.start().date(), NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(window.end().date(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn touching_windows_do_not_intersect() {
        let november = ReportingWindow::new(at(1, 0), at(15, 0)).expect("window");
        let later = ReportingWindow::new(at(15, 0), at(30, 0)).expect("window");
        let overlapping = ReportingWindow::new(at(10, 0), at(20, 0)).expect("window");
        assert!(!november.intersects(&later));
        assert!(november.intersects(&overlapping));
    }
}
