use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::attendance::AttendanceError;
use crate::utils::time::parse_timestamp;

/// Employee identity carried by every timekeeping row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeRef {
    #[schema(example = "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e")]
    pub employee_id: String,
    #[schema(example = "Nguyễn Văn A")]
    pub full_name: String,
    #[schema(example = "https://cdn.example.com/a.png", nullable = true)]
    pub avatar_url: Option<String>,
}

/// One attendance record for one employee on one work day.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRecord {
    pub employee: EmployeeRef,
    pub date: NaiveDate,
    pub checkin: Option<NaiveDateTime>,
    pub checkout: Option<NaiveDateTime>,
}

/// Timekeeping record as a client sends it: timestamps are untyped strings.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RawTimeRecord {
    #[schema(example = 42, nullable = true)]
    pub timekeeping_id: Option<u64>,
    pub employee: EmployeeRef,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "2024-01-01T08:10:00Z", nullable = true)]
    pub checkin: Option<String>,
    #[schema(example = "2024-01-01T17:30:00Z", nullable = true)]
    pub checkout: Option<String>,
}

fn parse_optional(value: Option<String>) -> Result<Option<NaiveDateTime>, AttendanceError> {
    match value {
        Some(s) if !s.trim().is_empty() => parse_timestamp(&s).map(Some),
        _ => Ok(None),
    }
}

impl TryFrom<RawTimeRecord> for TimeRecord {
    type Error = AttendanceError;

    fn try_from(raw: RawTimeRecord) -> Result<Self, Self::Error> {
        Ok(TimeRecord {
            employee: raw.employee,
            date: raw.date,
            checkin: parse_optional(raw.checkin)?,
            checkout: parse_optional(raw.checkout)?,
        })
    }
}

/// Row shape of the timekeeping list query (record joined with employee and work type).
#[derive(Debug, sqlx::FromRow)]
pub struct TimekeepingRow {
    pub timekeeping_id: u64,
    pub date: NaiveDate,
    pub checkin: Option<NaiveDateTime>,
    pub checkout: Option<NaiveDateTime>,
    pub work_hours: Option<f64>,
    pub leave_hours: Option<f64>,
    pub employee_id: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub work_type: Option<String>,
}

impl TimekeepingRow {
    pub fn to_record(&self) -> TimeRecord {
        TimeRecord {
            employee: EmployeeRef {
                employee_id: self.employee_id.clone(),
                full_name: self.full_name.clone(),
                avatar_url: self.avatar_url.clone(),
            },
            date: self.date,
            checkin: self.checkin,
            checkout: self.checkout,
        }
    }
}
