use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::timekeeping::{EmployeeRef, RawTimeRecord, TimekeepingRow};
use crate::service::attendance::{AttendanceClassifier, PunchStatus, RawClassification};
use crate::utils::time::format_hhmm;

pub(crate) const TIMEKEEPING_SELECT: &str = r#"
    SELECT
        t.timekeeping_id,
        t.date,
        t.checkin,
        t.checkout,
        t.work_hours,
        t.leave_hours,
        e.employee_id,
        e.full_name,
        e.avatar_url,
        w.name AS work_type
    FROM timekeepings t
    JOIN employees e ON e.employee_id = t.employee_id
    LEFT JOIN work_types w ON w.work_type_id = t.work_type_id
"#;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TimekeepingQuery {
    /// First day (inclusive); defaults to the first day of the current month
    #[param(value_type = Option<String>, format = "date", example = "2026-10-01")]
    pub from: Option<NaiveDate>,
    /// Last day (inclusive); defaults to the last day of the current month
    #[param(value_type = Option<String>, format = "date", example = "2026-10-31")]
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on the employee name
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimekeepingEntry {
    pub timekeeping_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub employee: EmployeeRef,
    /// Avatar URL with the placeholder applied
    pub avatar: String,
    #[schema(example = "Toàn thời gian", nullable = true)]
    pub work_type: Option<String>,
    #[schema(example = "08:05")]
    pub checkin: String,
    #[schema(example = "17:10")]
    pub checkout: String,
    pub status: PunchStatus,
    #[schema(example = "Đi muộn")]
    pub status_label: String,
    pub work_hours: f64,
    pub leave_hours: f64,
}

impl TimekeepingEntry {
    pub fn from_row(row: TimekeepingRow, classifier: &AttendanceClassifier) -> Self {
        let status = classifier.punch_status(row.checkin, row.checkout);
        let show = |t: &Option<chrono::NaiveDateTime>| {
            t.as_ref().map(format_hhmm).unwrap_or_else(|| "-".to_string())
        };

        TimekeepingEntry {
            timekeeping_id: row.timekeeping_id,
            date: row.date,
            avatar: classifier.avatar_or_default(row.avatar_url.as_deref()),
            checkin: show(&row.checkin),
            checkout: show(&row.checkout),
            status,
            status_label: status.label().to_string(),
            work_type: row.work_type,
            work_hours: row.work_hours.unwrap_or(0.0),
            leave_hours: row.leave_hours.unwrap_or(0.0),
            employee: EmployeeRef {
                employee_id: row.employee_id,
                full_name: row.full_name,
                avatar_url: row.avatar_url,
            },
        }
    }
}

/// First and last day of the month containing `today`.
pub fn month_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(first);
    (first, last)
}

/// Timekeeping records in a date range
#[utoipa::path(
    get,
    path = "/api/timekeeping",
    params(TimekeepingQuery),
    responses(
        (status = 200, description = "Records with punch status", body = [TimekeepingEntry]),
        (status = 400, description = "from is after to"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timekeeping"
)]
pub async fn list_timekeeping(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    classifier: web::Data<AttendanceClassifier>,
    query: web::Query<TimekeepingQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (default_from, default_to) = month_range(Local::now().date_naive());
    let from = query.from.unwrap_or(default_from);
    let to = query.to.unwrap_or(default_to);
    if from > to {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from cannot be after to"
        })));
    }

    let mut sql = format!("{TIMEKEEPING_SELECT} WHERE t.date BETWEEN ? AND ?");
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if search.is_some() {
        sql.push_str(" AND LOWER(e.full_name) LIKE ?");
    }
    sql.push_str(" ORDER BY t.date DESC, e.full_name");
    debug!(sql = %sql, %from, %to, ?search, "Fetching timekeeping");

    let mut q = sqlx::query_as::<_, TimekeepingRow>(&sql).bind(from).bind(to);
    if let Some(s) = search {
        q = q.bind(format!("%{}%", s.to_lowercase()));
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch timekeeping");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let entries: Vec<TimekeepingEntry> = rows
        .into_iter()
        .map(|row| TimekeepingEntry::from_row(row, &classifier))
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

/// One timekeeping record
#[utoipa::path(
    get,
    path = "/api/timekeeping/{timekeeping_id}",
    params(
        ("timekeeping_id" = u64, Path, description = "Timekeeping record id")
    ),
    responses(
        (status = 200, description = "Record found", body = TimekeepingEntry),
        (status = 404, description = "Record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timekeeping"
)]
pub async fn get_timekeeping(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    classifier: web::Data<AttendanceClassifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let timekeeping_id = path.into_inner();

    let row = sqlx::query_as::<_, TimekeepingRow>(&format!(
        "{TIMEKEEPING_SELECT} WHERE t.timekeeping_id = ?"
    ))
    .bind(timekeeping_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, timekeeping_id, "Failed to fetch timekeeping record");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match row {
        Some(row) => Ok(HttpResponse::Ok().json(TimekeepingEntry::from_row(row, &classifier))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Timekeeping record not found"
        }))),
    }
}

/// Delete a timekeeping record
#[utoipa::path(
    delete,
    path = "/api/timekeeping/{timekeeping_id}",
    params(
        ("timekeeping_id" = u64, Path, description = "Timekeeping record id")
    ),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Timekeeping record deleted"
        })),
        (status = 404, description = "Record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timekeeping"
)]
pub async fn delete_timekeeping(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let timekeeping_id = path.into_inner();

    let result = sqlx::query("DELETE FROM timekeepings WHERE timekeeping_id = ?")
        .bind(timekeeping_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, timekeeping_id, "Failed to delete timekeeping record");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Timekeeping record not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Timekeeping record deleted"
    })))
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/timekeeping/check-in",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timekeeping"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;

    let result = sqlx::query(
        r#"
        INSERT INTO timekeepings (employee_id, date, checkin)
        VALUES (?, CURDATE(), NOW())
        "#,
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Checked in successfully"
        }))),

        // one record per employee and day
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Ok(HttpResponse::BadRequest().json(json!({
                "message": "Already checked in today"
            })))
        }

        Err(e) => {
            error!(error = %e, employee_id, "Check-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Check out for today
#[utoipa::path(
    put,
    path = "/api/timekeeping/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No open check-in for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timekeeping"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;

    let result = sqlx::query(
        r#"
        UPDATE timekeepings
        SET checkout = NOW(),
            work_hours = ROUND(TIMESTAMPDIFF(MINUTE, checkin, NOW()) / 60, 2)
        WHERE employee_id = ?
        AND date = CURDATE()
        AND checkout IS NULL
        "#,
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active check-in found for today"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully"
    })))
}

/// Classify caller-supplied records into early / late / missing-punch lists
#[utoipa::path(
    post,
    path = "/api/timekeeping/classify",
    request_body = [RawTimeRecord],
    responses(
        (status = 200, description = "Buckets plus records that could not be parsed", body = RawClassification),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timekeeping"
)]
pub async fn classify(
    auth: AuthUser,
    classifier: web::Data<AttendanceClassifier>,
    body: web::Json<Vec<RawTimeRecord>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let out = classifier.classify_raw(body.into_inner());
    Ok(HttpResponse::Ok().json(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, issue_token};
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::models::TokenType;
    use crate::service::attendance::AttendancePolicy;
    use actix_web::{App, http::StatusCode};

    fn bearer(role: Role) -> String {
        let subject = TokenSubject {
            user_id: 1,
            email: "hr@company.vn".into(),
            role: role.id(),
            employee_id: None,
        };
        let (token, _) =
            issue_token(&subject, TokenType::Access, &Config::for_tests().jwt_secret, 60).unwrap();
        format!("Bearer {token}")
    }

    macro_rules! classify_app {
        () => {
            actix_web::test::init_service(
                App::new()
                    .app_data(web::Data::new(Config::for_tests()))
                    .app_data(web::Data::new(AttendanceClassifier::new(
                        AttendancePolicy::default(),
                        "/default-avatar.png",
                    )))
                    .route("/timekeeping/classify", web::post().to(classify)),
            )
            .await
        };
    }

    fn payload() -> serde_json::Value {
        json!([
            {
                "timekeeping_id": 1,
                "employee": { "employee_id": "E1", "full_name": "An", "avatar_url": "" },
                "date": "2024-01-01",
                "checkin": "2024-01-01T08:10:00Z",
                "checkout": "2024-01-01T17:00:00Z"
            },
            {
                "timekeeping_id": 2,
                "employee": { "employee_id": "E2", "full_name": "Bình", "avatar_url": null },
                "date": "2024-01-01",
                "checkin": null,
                "checkout": "2024-01-01T09:00:00Z"
            },
            {
                "timekeeping_id": 3,
                "employee": { "employee_id": "E3", "full_name": "Chi", "avatar_url": null },
                "date": "2024-01-01",
                "checkin": "2024-01-01T8h",
                "checkout": null
            }
        ])
    }

    #[actix_web::test]
    async fn classify_endpoint_buckets_and_rejects() {
        let app = classify_app!();
        let req = actix_web::test::TestRequest::post()
            .uri("/timekeeping/classify")
            .insert_header(("Authorization", bearer(Role::Hr)))
            .set_json(payload())
            .to_request();

        let body: serde_json::Value = actix_web::test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["late_arrivals"][0]["id"], "E1");
        assert_eq!(body["late_arrivals"][0]["delay_formatted"], "10 phút");
        assert_eq!(body["late_arrivals"][0]["avatar"], "/default-avatar.png");
        assert_eq!(body["missing_punch"][0]["missing"], "no_check_in");
        assert_eq!(body["missing_punch"][0]["action"], "Chưa checkin");
        assert_eq!(body["early_risers"].as_array().unwrap().len(), 0);
        assert_eq!(body["rejected"][0]["timekeeping_id"], 3);
    }

    #[actix_web::test]
    async fn classify_is_closed_to_employees() {
        let app = classify_app!();
        let req = actix_web::test::TestRequest::post()
            .uri("/timekeeping/classify")
            .insert_header(("Authorization", bearer(Role::Employee)))
            .set_json(payload())
            .to_request();
        let resp = actix_web::test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn month_range_covers_the_whole_month() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(month_range(d(2024, 2, 15)), (d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(month_range(d(2026, 12, 31)), (d(2026, 12, 1), d(2026, 12, 31)));
    }

    #[test]
    fn entry_carries_status_and_formatted_times() {
        let classifier = AttendanceClassifier::new(AttendancePolicy::default(), "/a.png");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let row = TimekeepingRow {
            timekeeping_id: 9,
            date,
            checkin: date.and_hms_opt(8, 0, 0),
            checkout: date.and_hms_opt(16, 30, 0),
            work_hours: Some(8.5),
            leave_hours: None,
            employee_id: "E1".into(),
            full_name: "An".into(),
            avatar_url: None,
            work_type: Some("Toàn thời gian".into()),
        };

        let entry = TimekeepingEntry::from_row(row, &classifier);
        assert_eq!(entry.status, PunchStatus::EarlyLeave);
        assert_eq!(entry.status_label, "Về sớm");
        assert_eq!(entry.checkin, "08:00");
        assert_eq!(entry.checkout, "16:30");
        assert_eq!(entry.avatar, "/a.png");
        assert_eq!(entry.leave_hours, 0.0);
    }
}
