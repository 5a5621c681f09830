use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, AsRefStr, Display, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Sick,
    Annual,
    Unpaid,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, AsRefStr, Display, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = "L-5f0c...")]
    pub id: String,
    #[schema(example = "susan.baker")]
    pub username: String,
    /// Filled in on admin/manager listings
    #[schema(example = "Susan Baker", nullable = true)]
    pub full_name: Option<String>,
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[schema(example = "Feeling unwell")]
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub applied_date: NaiveDate,
    #[schema(nullable = true)]
    pub processed_by: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewLeave {
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[schema(example = "Family event")]
    pub reason: String,
}
