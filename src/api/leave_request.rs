use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::utils::validation::{FieldError, invalid, optional_text};

const LEAVE_SELECT: &str = r#"
    SELECT
        l.leave_id,
        l.employee_id,
        e.full_name,
        e.avatar_url,
        t.name AS leave_type,
        l.reason,
        l.status,
        l.start_date,
        l.end_date,
        l.created_at
    FROM leave_requests l
    JOIN employees e ON e.employee_id = l.employee_id
    JOIN leave_types t ON t.leave_type_id = l.leave_type_id
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Việc gia đình")]
    pub reason: Option<String>,
}

impl CreateLeave {
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.start_date > self.end_date {
            return Err(FieldError::new(
                "end_date",
                "start_date cannot be after end_date",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by employee ID
    pub employee_id: Option<String>,
    /// PENDING, APPROVED or REJECTED (case-insensitive)
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page, at most 100
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// `(page, per_page, offset)` with page starting at 1.
pub fn paginate(page: Option<u64>, per_page: Option<u64>) -> (u64, u64, u64) {
    let per_page = per_page.unwrap_or(10).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

/// Create leave request
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "status": "PENDING"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    payload.validate().map_err(invalid)?;
    let payload = payload.into_inner();

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type_id, reason, status, start_date, end_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type_id)
    .bind(optional_text(payload.reason))
    .bind(LeaveStatus::Pending.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            info!(employee_id, leave_id = res.last_insert_id(), "Leave request submitted");
            Ok(HttpResponse::Created().json(json!({
                "message": "Leave request submitted",
                "status": LeaveStatus::Pending
            })))
        }

        // unknown leave_type_id
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Ok(HttpResponse::BadRequest().json(json!({
                "message": "Unknown leave type"
            })))
        }

        Err(e) => {
            error!(error = %e, employee_id, "Failed to create leave request");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Moves a PENDING request to `to`; anything else is left alone.
async fn decide(pool: &MySqlPool, leave_id: u64, to: LeaveStatus) -> actix_web::Result<HttpResponse> {
    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?
        WHERE leave_id = ?
        AND status = ?
        "#,
    )
    .bind(to.as_ref())
    .bind(leave_id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, status = %to, "Leave decision failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    }

    info!(leave_id, status = %to, "Leave request decided");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Leave {}", to.as_ref().to_lowercase()),
        "status": to
    })))
}

/// Approve leave (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved",
            "status": "APPROVED"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    decide(pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await
}

/// Reject leave (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected",
            "status": "REJECTED"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    decide(pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveRequest>(&format!("{LEAVE_SELECT} WHERE l.leave_id = ?"))
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to fetch leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match leave {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Leave request not found"
        }))),
    }
}

/// Paginated leave requests, newest first
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page);

    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<LeaveStatus>()
                .map_err(|_| invalid(FieldError::new("status", "Unknown leave status")))
        })
        .transpose()?;

    let mut where_sql = String::from(" WHERE 1=1");
    if query.employee_id.is_some() {
        where_sql.push_str(" AND l.employee_id = ?");
    }
    if status.is_some() {
        where_sql.push_str(" AND l.status = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests l{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(employee_id) = &query.employee_id {
        count_q = count_q.bind(employee_id);
    }
    if let Some(status) = status {
        count_q = count_q.bind(status.to_string());
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!("{LEAVE_SELECT}{where_sql} ORDER BY l.created_at DESC LIMIT ? OFFSET ?");
    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    if let Some(employee_id) = &query.employee_id {
        data_q = data_q.bind(employee_id);
    }
    if let Some(status) = status {
        data_q = data_q.bind(status.to_string());
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(paginate(None, None), (1, 10, 0));
        assert_eq!(paginate(Some(3), Some(20)), (3, 20, 40));
        assert_eq!(paginate(Some(0), Some(1000)), (1, 100, 0));
        assert_eq!(paginate(Some(2), Some(0)), (2, 1, 1));
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        assert_eq!(paginate(Some(u64::MAX), Some(100)), (u64::MAX, 100, u64::MAX));
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let body: CreateLeave = serde_json::from_value(json!({
            "leave_type_id": 1,
            "start_date": "2026-01-03",
            "end_date": "2026-01-01"
        }))
        .unwrap();
        assert_eq!(body.validate().unwrap_err().field, "end_date");
    }

    #[test]
    fn single_day_leave_is_valid() {
        let body: CreateLeave = serde_json::from_value(json!({
            "leave_type_id": 1,
            "start_date": "2026-01-03",
            "end_date": "2026-01-03",
            "reason": "Khám bệnh"
        }))
        .unwrap();
        assert!(body.validate().is_ok());
    }

    #[test]
    fn status_filter_is_case_insensitive() {
        assert_eq!("pending".parse::<LeaveStatus>().unwrap(), LeaveStatus::Pending);
        assert_eq!(LeaveStatus::Approved.as_ref(), "APPROVED");
        assert_eq!(LeaveStatus::Rejected.to_string(), "REJECTED");
        assert!("cancelled".parse::<LeaveStatus>().is_err());
    }
}
