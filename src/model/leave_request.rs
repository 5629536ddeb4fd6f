use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// Leave request joined with the requesting employee and leave type name.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub leave_id: u64,
    #[schema(example = "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e")]
    pub employee_id: String,
    #[schema(example = "Nguyễn Văn A")]
    pub full_name: String,
    #[schema(nullable = true)]
    pub avatar_url: Option<String>,
    #[schema(example = "Nghỉ phép năm")]
    pub leave_type: String,
    #[schema(example = "Việc gia đình", nullable = true)]
    pub reason: Option<String>,
    #[schema(example = "PENDING")]
    pub status: String,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = "2025-12-28T09:00:00", value_type = Option<String>, format = "date-time")]
    pub created_at: Option<NaiveDateTime>,
}
