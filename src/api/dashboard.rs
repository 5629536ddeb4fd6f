use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::api::timekeeping::TIMEKEEPING_SELECT;
use crate::auth::auth::AuthUser;
use crate::model::employee::Gender;
use crate::model::timekeeping::{TimeRecord, TimekeepingRow};
use crate::service::attendance::{AttendanceClassifier, Classification};
use crate::service::dashboard::{GenderStats, Kpis};

#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Day to summarise; defaults to today
    #[param(value_type = Option<String>, format = "date", example = "2026-10-18")]
    pub date: Option<NaiveDate>,
    /// Filters the three lists by name, id or missing-punch action
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub kpis: Kpis,
    pub gender: GenderStats,
    #[serde(flatten)]
    pub lists: Classification,
}

/// KPIs are computed over the whole day; `search` narrows only the lists.
pub fn build_dashboard(
    classifier: &AttendanceClassifier,
    date: NaiveDate,
    records: &[TimeRecord],
    leave_requests: usize,
    genders: impl IntoIterator<Item = Gender>,
    search: Option<&str>,
) -> DashboardResponse {
    let buckets = classifier.classify(records);
    let kpis = Kpis::compute(records, &buckets, leave_requests);

    DashboardResponse {
        date,
        kpis,
        gender: GenderStats::tally(genders),
        lists: match search {
            Some(q) => buckets.filter(q),
            None => buckets,
        },
    }
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Attendance lists and headline numbers for the day", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    classifier: web::Data<AttendanceClassifier>,
    query: web::Query<DashboardQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    debug!(%date, "Building dashboard");

    let internal = |what: &'static str| {
        move |e: sqlx::Error| {
            error!(error = %e, %date, "Failed to fetch {what}");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        }
    };

    let rows = sqlx::query_as::<_, TimekeepingRow>(&format!(
        "{TIMEKEEPING_SELECT} WHERE t.date = ? ORDER BY e.full_name"
    ))
    .bind(date)
    .fetch_all(pool.get_ref())
    .await
    .map_err(internal("timekeeping"))?;

    let (leave_requests,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM leave_requests
        WHERE status <> 'REJECTED'
        AND ? BETWEEN start_date AND end_date
        "#,
    )
    .bind(date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(internal("leave requests"))?;

    let genders: Vec<(Option<String>,)> = sqlx::query_as("SELECT gender FROM employees")
        .fetch_all(pool.get_ref())
        .await
        .map_err(internal("employee genders"))?;

    let records: Vec<TimeRecord> = rows.iter().map(TimekeepingRow::to_record).collect();
    let response = build_dashboard(
        &classifier,
        date,
        &records,
        usize::try_from(leave_requests).unwrap_or(0),
        genders.into_iter().map(|(g,)| {
            g.as_deref()
                .and_then(|g| g.parse().ok())
                .unwrap_or(Gender::Other)
        }),
        query.search.as_deref(),
    );

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::timekeeping::EmployeeRef;
    use crate::service::attendance::AttendancePolicy;

    fn record(id: &str, name: &str, checkin: Option<(u32, u32)>, checkout: bool) -> TimeRecord {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        TimeRecord {
            employee: EmployeeRef {
                employee_id: id.into(),
                full_name: name.into(),
                avatar_url: None,
            },
            date,
            checkin: checkin.map(|(h, m)| date.and_hms_opt(h, m, 0).unwrap()),
            checkout: checkout.then(|| date.and_hms_opt(17, 30, 0).unwrap()),
        }
    }

    #[test]
    fn search_narrows_lists_but_not_kpis() {
        let classifier = AttendanceClassifier::new(AttendancePolicy::default(), "/a.png");
        let records = vec![
            record("E1", "Trần An", Some((8, 20)), true),
            record("E2", "Lê Bình", Some((9, 0)), true),
            record("E3", "Phạm Chi", None, true),
        ];

        let out = build_dashboard(
            &classifier,
            records[0].date,
            &records,
            2,
            [Gender::Male, Gender::Female, Gender::Female],
            Some("bình"),
        );

        assert_eq!(out.kpis.attendance, 2);
        assert_eq!(out.kpis.late_arrivals, 2);
        assert_eq!(out.kpis.missing_punch, 1);
        assert_eq!(out.kpis.leave_requests, 2);
        assert_eq!(out.gender.women, 2);

        assert_eq!(out.lists.late_arrivals.len(), 1);
        assert_eq!(out.lists.late_arrivals[0].id, "E2");
        assert_eq!(out.lists.late_arrivals[0].delay_formatted, "1 giờ");
        assert!(out.lists.missing_punch.is_empty());
    }

    #[test]
    fn lists_are_flattened_into_the_response() {
        let classifier = AttendanceClassifier::new(AttendancePolicy::default(), "/a.png");
        let records = vec![record("E1", "An", Some((7, 45)), true)];
        let out = build_dashboard(&classifier, records[0].date, &records, 0, Vec::new(), None);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["early_risers"][0]["time_formatted"], "15 phút");
        assert_eq!(json["date"], "2026-10-16");
        assert!(json.get("lists").is_none());
    }
}
