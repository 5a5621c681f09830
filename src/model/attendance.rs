use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geo::Coordinates;

/// Natural key of a daily attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttendanceKey {
    pub username: String,
    pub date: NaiveDate,
}

impl AttendanceKey {
    pub fn new(username: &str, date: NaiveDate) -> Self {
        Self {
            username: username.to_string(),
            date,
        }
    }
}

/// What the employee submitted with a check-in or check-out, plus the resolved address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Capture {
    pub coords: Coordinates,
    /// Selfie reference (base64 data URI or storage key)
    pub image: String,
    #[schema(example = "Station Road, Nawabshah")]
    pub address: String,
    #[schema(nullable = true)]
    pub uri: Option<String>,
}

/// A single check-in or check-out.
///
/// `capture` is only absent on a system generated auto-checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Punch {
    #[schema(example = "2026-01-01T09:05:15", format = "date-time", value_type = String)]
    pub time: NaiveDateTime,
    #[schema(nullable = true)]
    pub capture: Option<Capture>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttendanceState {
    Empty,
    CheckedIn,
    CheckedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "john.doe")]
    pub username: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(nullable = true)]
    pub check_in: Option<Punch>,
    #[schema(nullable = true)]
    pub check_out: Option<Punch>,
    pub is_auto_checkout: bool,
}

impl AttendanceRecord {
    pub fn new(username: &str, date: NaiveDate) -> Self {
        Self {
            username: username.to_string(),
            date,
            check_in: None,
            check_out: None,
            is_auto_checkout: false,
        }
    }

    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(&self.username, self.date)
    }

    pub fn state(&self) -> AttendanceState {
        match (&self.check_in, &self.check_out) {
            (None, _) => AttendanceState::Empty,
            (Some(_), None) => AttendanceState::CheckedIn,
            (Some(_), Some(_)) => AttendanceState::CheckedOut,
        }
    }

    pub fn check_in_time(&self) -> Option<NaiveDateTime> {
        self.check_in.as_ref().map(|p| p.time)
    }

    pub fn check_out_time(&self) -> Option<NaiveDateTime> {
        self.check_out.as_ref().map(|p| p.time)
    }

    pub fn check_in_capture(&self) -> Option<&Capture> {
        self.check_in.as_ref().and_then(|p| p.capture.as_ref())
    }

    pub fn check_out_capture(&self) -> Option<&Capture> {
        self.check_out.as_ref().and_then(|p| p.capture.as_ref())
    }
}

/// Snapshot of today's attendance for one employee.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TodayStatus {
    pub has_checked_in: bool,
    pub has_checked_out: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_out_time: Option<NaiveDateTime>,
    /// Check-in address
    pub location: Option<String>,
    pub location_uri: Option<String>,
    pub check_in_coords: Option<Coordinates>,
    pub is_auto_checkout: bool,
}

impl From<Option<&AttendanceRecord>> for TodayStatus {
    fn from(record: Option<&AttendanceRecord>) -> Self {
        let capture = record.and_then(|r| r.check_in_capture());
        Self {
            has_checked_in: record.is_some_and(|r| r.check_in.is_some()),
            has_checked_out: record.is_some_and(|r| r.check_out.is_some()),
            check_in_time: record.and_then(|r| r.check_in_time()),
            check_out_time: record.and_then(|r| r.check_out_time()),
            location: capture.map(|c| c.address.clone()),
            location_uri: capture.and_then(|c| c.uri.clone()),
            check_in_coords: capture.map(|c| c.coords),
            is_auto_checkout: record.is_some_and(|r| r.is_auto_checkout),
        }
    }
}
