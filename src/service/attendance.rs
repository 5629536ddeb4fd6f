//! Attendance classification.
//!
//! Two independent views over the same records, both driven by one
//! [`AttendancePolicy`]:
//!
//! * [`AttendanceClassifier::classify`] buckets a day's records into early,
//!   late and missing-punch lists for the dashboard, looking only at how far
//!   the check-in is from the standard start time.
//! * [`AttendanceClassifier::punch_status`] labels a single record for the
//!   timekeeping table using both the start and the end of the shift.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::model::timekeeping::{RawTimeRecord, TimeRecord};
use crate::utils::time::{format_hhmm, minutes_of_day};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("malformed timestamp {0:?}: expected a date followed by HH:MM")]
    MalformedTimestamp(String),
}

/// Working-day reference times used for every lateness computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    pub standard_start: NaiveTime,
    pub standard_end: NaiveTime,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            standard_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            standard_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

impl AttendancePolicy {
    pub fn standard_start_minutes(&self) -> u32 {
        minutes_of_day(self.standard_start)
    }

    pub fn standard_end_minutes(&self) -> u32 {
        minutes_of_day(self.standard_end)
    }

    pub fn standard_start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.standard_start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceBucket {
    EarlyOrOnTime,
    Late,
    MissingPunch,
}

/// Which punch a missing-punch record lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum MissingSide {
    #[serde(rename = "no_check_in")]
    CheckIn,
    #[serde(rename = "no_check_out")]
    CheckOut,
}

impl MissingSide {
    pub fn label(self) -> &'static str {
        match self {
            MissingSide::CheckIn => "Chưa checkin",
            MissingSide::CheckOut => "Chưa checkout",
        }
    }
}

/// Per-record status shown in the timekeeping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PunchStatus {
    OnTime,
    Late,
    EarlyLeave,
    Incomplete,
}

impl PunchStatus {
    pub fn label(self) -> &'static str {
        match self {
            PunchStatus::OnTime => "Đúng giờ",
            PunchStatus::Late => "Đi muộn",
            PunchStatus::EarlyLeave => "Về sớm",
            PunchStatus::Incomplete => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EarlyRow {
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// How long before the standard start the employee checked in.
    #[schema(example = "15 phút")]
    pub time_formatted: String,
    #[schema(example = "07:45")]
    pub checkin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LateRow {
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "1 giờ 5 phút")]
    pub delay_formatted: String,
    #[schema(example = "09:05")]
    pub checkin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MissingPunchRow {
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub missing: MissingSide,
    #[schema(example = "Chưa checkin")]
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Classification {
    pub early_risers: Vec<EarlyRow>,
    pub late_arrivals: Vec<LateRow>,
    pub missing_punch: Vec<MissingPunchRow>,
}

impl Classification {
    /// Case-insensitive search over name and employee id; missing-punch rows
    /// also match on their action label. A blank query keeps everything.
    pub fn filter(&self, query: &str) -> Classification {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return self.clone();
        }
        let hit = |name: &str, id: &str| {
            name.to_lowercase().contains(&q) || id.to_lowercase().contains(&q)
        };

        Classification {
            early_risers: self
                .early_risers
                .iter()
                .filter(|r| hit(&r.name, &r.id))
                .cloned()
                .collect(),
            late_arrivals: self
                .late_arrivals
                .iter()
                .filter(|r| hit(&r.name, &r.id))
                .cloned()
                .collect(),
            missing_punch: self
                .missing_punch
                .iter()
                .filter(|r| hit(&r.name, &r.id) || r.action.to_lowercase().contains(&q))
                .cloned()
                .collect(),
        }
    }
}

/// A client record that could not be classified.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RejectedRecord {
    pub timekeeping_id: Option<u64>,
    pub employee_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct RawClassification {
    #[serde(flatten)]
    pub classification: Classification,
    pub rejected: Vec<RejectedRecord>,
}

/// `"{h} giờ {m} phút"`, dropping the hour part below one hour and the
/// minute part on whole hours.
pub fn format_minutes(mins: u64) -> String {
    if mins < 60 {
        return format!("{mins} phút");
    }
    let (h, m) = (mins / 60, mins % 60);
    if m > 0 {
        format!("{h} giờ {m} phút")
    } else {
        format!("{h} giờ")
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceClassifier {
    policy: AttendancePolicy,
    default_avatar: String,
}

impl AttendanceClassifier {
    pub fn new(policy: AttendancePolicy, default_avatar: impl Into<String>) -> Self {
        Self {
            policy,
            default_avatar: default_avatar.into(),
        }
    }

    /// Trimmed avatar URL, or the placeholder when absent or blank.
    pub fn avatar_or_default(&self, avatar_url: Option<&str>) -> String {
        match avatar_url.map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => self.default_avatar.clone(),
        }
    }

    /// Whole minutes from the standard start on the record's date to the
    /// check-in, truncated toward zero. `None` when either punch is missing.
    pub fn checkin_offset_minutes(&self, record: &TimeRecord) -> Option<i64> {
        let checkin = record.checkin?;
        record.checkout?;
        Some(
            (checkin - self.policy.standard_start_on(record.date)).num_minutes(),
        )
    }

    /// `None` for a check-in exactly on the standard start: such records
    /// belong to no list.
    pub fn bucket(&self, record: &TimeRecord) -> Option<AttendanceBucket> {
        match self.checkin_offset_minutes(record) {
            None => Some(AttendanceBucket::MissingPunch),
            Some(diff) if diff < 0 => Some(AttendanceBucket::EarlyOrOnTime),
            Some(diff) if diff > 0 => Some(AttendanceBucket::Late),
            Some(_) => None,
        }
    }

    pub fn classify(&self, records: &[TimeRecord]) -> Classification {
        let mut out = Classification::default();

        for record in records {
            let employee = &record.employee;
            let avatar = self.avatar_or_default(employee.avatar_url.as_deref());

            let bucket = match self.bucket(record) {
                Some(bucket) => bucket,
                None => continue,
            };

            if bucket == AttendanceBucket::MissingPunch {
                let missing = if record.checkin.is_none() {
                    MissingSide::CheckIn
                } else {
                    MissingSide::CheckOut
                };
                out.missing_punch.push(MissingPunchRow {
                    id: employee.employee_id.clone(),
                    name: employee.full_name.clone(),
                    avatar,
                    date: record.date,
                    missing,
                    action: missing.label().to_string(),
                });
                continue;
            }

            let (Some(checkin), Some(diff)) = (record.checkin, self.checkin_offset_minutes(record))
            else {
                continue;
            };
            let offset = format_minutes(diff.unsigned_abs());

            if bucket == AttendanceBucket::EarlyOrOnTime {
                out.early_risers.push(EarlyRow {
                    id: employee.employee_id.clone(),
                    name: employee.full_name.clone(),
                    avatar,
                    date: record.date,
                    time_formatted: offset,
                    checkin: format_hhmm(&checkin),
                });
            } else {
                out.late_arrivals.push(LateRow {
                    id: employee.employee_id.clone(),
                    name: employee.full_name.clone(),
                    avatar,
                    date: record.date,
                    delay_formatted: offset,
                    checkin: format_hhmm(&checkin),
                });
            }
        }

        out
    }

    /// Converts client records at the boundary; malformed ones are reported
    /// instead of failing the whole list.
    pub fn classify_raw(&self, raw: Vec<RawTimeRecord>) -> RawClassification {
        let mut records = Vec::with_capacity(raw.len());
        let mut rejected = Vec::new();

        for item in raw {
            let timekeeping_id = item.timekeeping_id;
            let employee_id = item.employee.employee_id.clone();
            match TimeRecord::try_from(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, ?timekeeping_id, %employee_id, "Skipping unclassifiable record");
                    rejected.push(RejectedRecord {
                        timekeeping_id,
                        employee_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        RawClassification {
            classification: self.classify(&records),
            rejected,
        }
    }

    /// Late when checking in after the standard start, otherwise early-leave
    /// when checking out before the standard end. Exact boundaries are on time.
    pub fn punch_status(
        &self,
        checkin: Option<NaiveDateTime>,
        checkout: Option<NaiveDateTime>,
    ) -> PunchStatus {
        let (Some(checkin), Some(checkout)) = (checkin, checkout) else {
            return PunchStatus::Incomplete;
        };

        if minutes_of_day(checkin.time()) > self.policy.standard_start_minutes() {
            PunchStatus::Late
        } else if minutes_of_day(checkout.time()) < self.policy.standard_end_minutes() {
            PunchStatus::EarlyLeave
        } else {
            PunchStatus::OnTime
        }
    }
}
