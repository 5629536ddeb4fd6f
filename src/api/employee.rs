use std::collections::{BTreeSet, HashMap};

use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, http::StatusCode, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::assignment::{AssignmentKey, PositionAssignment};
use crate::model::employee::{Employee, EmployeeDetail, Gender};
use crate::service::assignment::{
    AssignmentChange, AssignmentStore, AssignmentSync, ChangeOutcome, apply, reconcile, sync,
};
use crate::service::operation::OperationStatus;
use crate::utils::catalog_cache::CatalogCache;
use crate::utils::db_utils::{SqlValue, build_insert_sql, build_update_sql, execute_update};
use crate::utils::validation::{FieldError, invalid, optional_text, optional_url, required};

const EMPLOYEE_SELECT: &str = r#"
    SELECT
        employee_id, full_name, dob, gender, place_of_birth, hometown,
        nationality, ethnicity, religion, marital_status, health_status, avatar_url
    FROM employees
"#;

pub(crate) const ASSIGNMENT_SELECT: &str = r#"
    SELECT
        pa.employee_id,
        pa.department_id,
        d.department_name,
        pa.position_id,
        p.position_name,
        pa.active
    FROM position_assignments pa
    JOIN departments d ON d.department_id = pa.department_id
    JOIN positions p ON p.position_id = pa.position_id
"#;

/// Editable employee fields. Absent fields are left untouched; an empty
/// string clears an optional column. Identifiers and client-side metadata
/// in the body are ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmployeeFields {
    #[schema(example = "Nguyễn Văn A")]
    pub full_name: Option<String>,
    #[schema(example = "1995-04-12", format = "date")]
    pub dob: Option<String>,
    pub gender: Option<Gender>,
    pub place_of_birth: Option<String>,
    pub hometown: Option<String>,
    pub nationality: Option<String>,
    pub ethnicity: Option<String>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub health_status: Option<String>,
    #[schema(example = "https://cdn.example.com/a.png")]
    pub avatar_url: Option<String>,
}

impl EmployeeFields {
    /// Validated `(column, value)` pairs in a fixed column order.
    pub fn columns(self) -> Result<Vec<(&'static str, SqlValue)>, FieldError> {
        let mut columns = Vec::new();

        if let Some(name) = self.full_name {
            let name = required("full_name", &name, "Họ tên không được để trống")?;
            columns.push(("full_name", SqlValue::String(name)));
        }
        if let Some(dob) = self.dob {
            columns.push(("dob", parse_dob(&dob)?.into()));
        }
        if let Some(gender) = self.gender {
            columns.push(("gender", SqlValue::String(gender.to_string())));
        }

        let texts = [
            ("place_of_birth", self.place_of_birth),
            ("hometown", self.hometown),
            ("nationality", self.nationality),
            ("ethnicity", self.ethnicity),
            ("religion", self.religion),
            ("marital_status", self.marital_status),
            ("health_status", self.health_status),
        ];
        for (column, value) in texts {
            if value.is_some() {
                columns.push((column, optional_text(value).into()));
            }
        }

        if self.avatar_url.is_some() {
            columns.push(("avatar_url", optional_url("avatar_url", self.avatar_url)?.into()));
        }

        Ok(columns)
    }
}

fn parse_dob(raw: &str) -> Result<Option<NaiveDate>, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FieldError::new("dob", "Ngày sinh phải có dạng YYYY-MM-DD"))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[serde(flatten)]
    pub fields: EmployeeFields,
    /// Initial `department_id:position_id` assignments
    #[serde(default)]
    #[schema(value_type = Vec<String>, example = json!(["d-01:p-01"]))]
    pub assignments: Vec<AssignmentKey>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[serde(flatten)]
    pub fields: EmployeeFields,
    /// Full selection of active assignments; omit to leave them untouched
    #[schema(value_type = Option<Vec<String>>, example = json!(["d-01:p-01", "d-02:p-03"]))]
    pub assignments: Option<Vec<AssignmentKey>>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Case-insensitive match on name or employee id
    pub search: Option<String>,
}

/// Per-step result of an employee write.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeWriteReport {
    pub employee_id: String,
    pub employee: OperationStatus,
    /// Reading the current assignments before reconciling; `idle` when none
    /// had to be read.
    pub assignment_lookup: OperationStatus,
    pub assignments: Vec<ChangeOutcome>,
}

impl EmployeeWriteReport {
    pub fn has_failures(&self) -> bool {
        self.employee.is_failed()
            || self.assignment_lookup.is_failed()
            || self.assignments.iter().any(|o| o.status.is_failed())
    }

    /// 200 when every step went through, 207 otherwise.
    pub fn status_code(&self) -> StatusCode {
        if self.has_failures() {
            StatusCode::MULTI_STATUS
        } else {
            StatusCode::OK
        }
    }
}

/// Toggles rows in `position_assignments`, creating them on first use.
pub struct MySqlAssignmentStore<'a> {
    pub pool: &'a MySqlPool,
}

impl AssignmentStore for MySqlAssignmentStore<'_> {
    type Error = sqlx::Error;

    async fn active_keys(&self, employee_id: &str) -> Result<BTreeSet<AssignmentKey>, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT department_id, position_id
            FROM position_assignments
            WHERE employee_id = ? AND active = TRUE
            "#,
        )
        .bind(employee_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(d, p)| AssignmentKey::new(d, p))
            .collect())
    }

    async fn set_active(&self, employee_id: &str, change: &AssignmentChange) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO position_assignments (employee_id, department_id, position_id, active)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE active = VALUES(active)
            "#,
        )
        .bind(employee_id)
        .bind(&change.key.department_id)
        .bind(&change.key.position_id)
        .bind(change.active)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// Deduplicates the selection and checks every key against the catalog.
async fn checked_selection(
    cache: &CatalogCache,
    pool: &MySqlPool,
    selection: Vec<AssignmentKey>,
) -> actix_web::Result<BTreeSet<AssignmentKey>> {
    let selection: BTreeSet<AssignmentKey> = selection.into_iter().collect();
    if selection.is_empty() {
        return Ok(selection);
    }

    let catalog = cache.get(pool).await.map_err(|e| {
        error!(error = %e, "Failed to load catalog");
        ErrorInternalServerError("Internal Server Error")
    })?;

    for key in &selection {
        catalog.check(key).map_err(invalid)?;
    }
    Ok(selection)
}

/// Runs the assignment step of an update once the field step is done. The
/// field step's status is reported whatever happens to the assignments.
pub(crate) async fn finish_update<S: AssignmentStore>(
    store: &S,
    employee_id: String,
    employee: OperationStatus,
    selection: Option<BTreeSet<AssignmentKey>>,
) -> EmployeeWriteReport {
    let AssignmentSync { lookup, changes } = match selection {
        Some(selection) => sync(store, &employee_id, &selection).await,
        None => AssignmentSync {
            lookup: OperationStatus::Idle,
            changes: Vec::new(),
        },
    };

    EmployeeWriteReport {
        employee_id,
        employee,
        assignment_lookup: lookup,
        assignments: changes,
    }
}

async fn employee_exists(pool: &MySqlPool, employee_id: &str) -> Result<bool, sqlx::Error> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT employee_id FROM employees WHERE employee_id = ?")
            .bind(employee_id)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = EmployeeWriteReport),
        (status = 207, description = "Employee created, some assignments failed", body = EmployeeWriteReport),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "full_name: Họ tên không được để trống"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    catalog: web::Data<CatalogCache>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let CreateEmployee { fields, assignments } = payload.into_inner();

    if fields.full_name.is_none() {
        return Err(invalid(FieldError::new(
            "full_name",
            "Họ tên không được để trống",
        )));
    }
    let mut columns = fields.columns().map_err(invalid)?;
    let selection = checked_selection(&catalog, &pool, assignments).await?;

    let employee_id = uuid::Uuid::new_v4().to_string();
    columns.insert(0, ("employee_id", SqlValue::String(employee_id.clone())));
    let insert = build_insert_sql("employees", columns)?;
    debug!(sql = %insert.sql, "Creating employee");

    execute_update(pool.get_ref(), insert).await.map_err(|e| {
        error!(error = %e, "Failed to create employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let plan = reconcile(&BTreeSet::new(), &selection);
    let outcomes = apply(&MySqlAssignmentStore { pool: pool.get_ref() }, &employee_id, &plan).await;

    info!(%employee_id, assignments = outcomes.len(), "Employee created");

    let report = EmployeeWriteReport {
        employee_id,
        employee: OperationStatus::Succeeded,
        assignment_lookup: OperationStatus::Idle,
        assignments: outcomes,
    };
    let status = if report.has_failures() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::CREATED
    };
    Ok(HttpResponse::build(status).json(report))
}

/// Employees with their position assignments
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employee list", body = [EmployeeDetail])
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut sql = EMPLOYEE_SELECT.to_string();
    if search.is_some() {
        sql.push_str(" WHERE LOWER(full_name) LIKE ? OR LOWER(employee_id) LIKE ?");
    }
    sql.push_str(" ORDER BY full_name");
    debug!(sql = %sql, ?search, "Fetching employees");

    let mut q = sqlx::query_as::<_, Employee>(&sql);
    if let Some(s) = search {
        let like = format!("%{}%", s.to_lowercase());
        q = q.bind(like.clone()).bind(like);
    }
    let employees = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %sql, "Failed to fetch employees");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let assignments =
        sqlx::query_as::<_, PositionAssignment>(&format!("{ASSIGNMENT_SELECT} WHERE pa.active = TRUE"))
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch position assignments");
                ErrorInternalServerError("Internal Server Error")
            })?;

    let mut by_employee: HashMap<String, Vec<PositionAssignment>> = HashMap::new();
    for a in assignments {
        by_employee.entry(a.employee_id.clone()).or_default().push(a);
    }

    let data: Vec<EmployeeDetail> = employees
        .into_iter()
        .map(|e| {
            let assigned = by_employee.remove(&e.employee_id).unwrap_or_default();
            EmployeeDetail::new(e, assigned)
        })
        .collect();

    Ok(HttpResponse::Ok().json(data))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetail),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>(&format!("{EMPLOYEE_SELECT} WHERE employee_id = ?"))
        .bind(&employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, %employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(employee) = employee else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    // Inactive rows are returned too so the editor can show history.
    let assignments = sqlx::query_as::<_, PositionAssignment>(&format!(
        "{ASSIGNMENT_SELECT} WHERE pa.employee_id = ? ORDER BY d.department_name, p.position_name"
    ))
    .bind(&employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, %employee_id, "Failed to fetch position assignments");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(EmployeeDetail::new(employee, assignments)))
}

/// Update Employee
///
/// Field changes and assignment changes are applied independently; each
/// step's outcome is reported.
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Every step succeeded", body = EmployeeWriteReport),
        (status = 207, description = "At least one step failed", body = EmployeeWriteReport),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    catalog: web::Data<CatalogCache>,
    path: web::Path<String>,
    body: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();
    let UpdateEmployee { fields, assignments } = body.into_inner();

    let columns = fields.columns().map_err(invalid)?;
    let selection = match assignments {
        Some(keys) => Some(checked_selection(&catalog, &pool, keys).await?),
        None => None,
    };

    let internal = |e: sqlx::Error| {
        error!(error = %e, %employee_id, "Failed to update employee");
        ErrorInternalServerError("Internal Server Error")
    };

    if !employee_exists(pool.get_ref(), &employee_id).await.map_err(internal)? {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    let employee = if columns.is_empty() {
        OperationStatus::Idle
    } else {
        let update = build_update_sql(
            "employees",
            columns,
            "employee_id",
            SqlValue::String(employee_id.clone()),
        )?;
        let result = execute_update(pool.get_ref(), update).await.map(|_| ());
        if let Err(e) = &result {
            error!(error = %e, %employee_id, "Employee field update failed");
        }
        result.into()
    };

    let store = MySqlAssignmentStore { pool: pool.get_ref() };
    let report = finish_update(&store, employee_id, employee, selection).await;
    Ok(HttpResponse::build(report.status_code()).json(report))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error", body = Object)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE employee_id = ?")
        .bind(&employee_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Employee not found"
                })));
            }

            info!(%employee_id, "Employee deleted");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            error!(error = %e, %employee_id, "Failed to delete employee");

            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
