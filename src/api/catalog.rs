//! Shared plumbing for the two catalog tables (departments and positions).

use std::collections::HashMap;

use actix_web::{HttpResponse, error::ErrorInternalServerError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::utils::catalog_cache::CatalogCache;
use crate::utils::validation::{invalid, required};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Department,
    Position,
}

impl CatalogKind {
    fn table(self) -> &'static str {
        match self {
            CatalogKind::Department => "departments",
            CatalogKind::Position => "positions",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            CatalogKind::Department => "department_id",
            CatalogKind::Position => "position_id",
        }
    }

    fn name_column(self) -> &'static str {
        match self {
            CatalogKind::Department => "department_name",
            CatalogKind::Position => "position_name",
        }
    }

    fn label(self) -> &'static str {
        match self {
            CatalogKind::Department => "Department",
            CatalogKind::Position => "Position",
        }
    }

    fn blank_name_message(self) -> &'static str {
        match self {
            CatalogKind::Department => "Tên phòng ban không được để trống",
            CatalogKind::Position => "Tên chức vụ không được để trống",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NameBody {
    #[schema(example = "Phòng Kỹ thuật")]
    pub name: String,
}

/// An employee holding an active assignment.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Member {
    pub employee_id: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub department_id: String,
    pub department_name: String,
    pub position_id: String,
    pub position_name: String,
}

/// A department or position with everyone actively assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CatalogGroup {
    pub id: String,
    pub name: String,
    pub members: Vec<Member>,
}

/// Attaches members to their group, keeping the order of `entries`.
pub fn group_members(
    kind: CatalogKind,
    entries: Vec<(String, String)>,
    members: Vec<Member>,
) -> Vec<CatalogGroup> {
    let mut by_id: HashMap<String, Vec<Member>> = HashMap::new();
    for m in members {
        let id = match kind {
            CatalogKind::Department => m.department_id.clone(),
            CatalogKind::Position => m.position_id.clone(),
        };
        by_id.entry(id).or_default().push(m);
    }

    entries
        .into_iter()
        .map(|(id, name)| CatalogGroup {
            members: by_id.remove(&id).unwrap_or_default(),
            id,
            name,
        })
        .collect()
}

fn db_error(kind: CatalogKind, action: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e| {
        error!(error = %e, table = kind.table(), action, "Catalog query failed");
        ErrorInternalServerError("Internal Server Error")
    }
}

pub async fn list_with_members(
    kind: CatalogKind,
    pool: &MySqlPool,
) -> actix_web::Result<Vec<CatalogGroup>> {
    let entries: Vec<(String, String)> = sqlx::query_as(&format!(
        "SELECT {id}, {name} FROM {table} ORDER BY {name}",
        id = kind.id_column(),
        name = kind.name_column(),
        table = kind.table(),
    ))
    .fetch_all(pool)
    .await
    .map_err(db_error(kind, "list"))?;

    let members = sqlx::query_as::<_, Member>(
        r#"
        SELECT
            e.employee_id,
            e.full_name,
            e.avatar_url,
            d.department_id,
            d.department_name,
            p.position_id,
            p.position_name
        FROM position_assignments pa
        JOIN employees e ON e.employee_id = pa.employee_id
        JOIN departments d ON d.department_id = pa.department_id
        JOIN positions p ON p.position_id = pa.position_id
        WHERE pa.active = TRUE
        ORDER BY e.full_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_error(kind, "members"))?;

    Ok(group_members(kind, entries, members))
}

pub async fn create(
    kind: CatalogKind,
    pool: &MySqlPool,
    cache: &CatalogCache,
    body: NameBody,
) -> actix_web::Result<HttpResponse> {
    let name = required("name", &body.name, kind.blank_name_message()).map_err(invalid)?;
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(&format!(
        "INSERT INTO {} ({}, {}) VALUES (?, ?)",
        kind.table(),
        kind.id_column(),
        kind.name_column()
    ))
    .bind(&id)
    .bind(&name)
    .execute(pool)
    .await
    .map_err(db_error(kind, "create"))?;

    cache.invalidate().await;
    info!(table = kind.table(), %id, %name, "Catalog entry created");

    Ok(HttpResponse::Created().json(json!({ "id": id, "name": name })))
}

pub async fn rename(
    kind: CatalogKind,
    pool: &MySqlPool,
    cache: &CatalogCache,
    id: String,
    body: NameBody,
) -> actix_web::Result<HttpResponse> {
    let name = required("name", &body.name, kind.blank_name_message()).map_err(invalid)?;

    let result = sqlx::query(&format!(
        "UPDATE {} SET {} = ? WHERE {} = ?",
        kind.table(),
        kind.name_column(),
        kind.id_column()
    ))
    .bind(&name)
    .bind(&id)
    .execute(pool)
    .await
    .map_err(db_error(kind, "rename"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": format!("{} not found", kind.label())
        })));
    }

    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(json!({ "id": id, "name": name })))
}

pub async fn delete(
    kind: CatalogKind,
    pool: &MySqlPool,
    cache: &CatalogCache,
    id: String,
) -> actix_web::Result<HttpResponse> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE {} = ?",
        kind.table(),
        kind.id_column()
    ))
    .bind(&id)
    .execute(pool)
    .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => Ok(HttpResponse::NotFound().json(json!({
            "message": format!("{} not found", kind.label())
        }))),

        Ok(_) => {
            cache.invalidate().await;
            info!(table = kind.table(), %id, "Catalog entry deleted");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        // still referenced by position_assignments
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Ok(HttpResponse::Conflict().json(json!({
                "message": format!("{} still has assignments", kind.label())
            })))
        }

        Err(e) => Err(db_error(kind, "delete")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(employee: &str, dept: &str, pos: &str) -> Member {
        Member {
            employee_id: employee.into(),
            full_name: employee.into(),
            avatar_url: None,
            department_id: dept.into(),
            department_name: format!("Phòng {dept}"),
            position_id: pos.into(),
            position_name: format!("Chức vụ {pos}"),
        }
    }

    #[test]
    fn groups_members_by_department() {
        let groups = group_members(
            CatalogKind::Department,
            vec![("D2".into(), "Kế toán".into()), ("D1".into(), "Kỹ thuật".into())],
            vec![member("E1", "D1", "P1"), member("E2", "D1", "P2"), member("E3", "D9", "P1")],
        );

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, "D2");
        assert!(groups[0].members.is_empty());
        assert_eq!(groups[1].members.len(), 2);
    }

    #[test]
    fn groups_members_by_position() {
        let groups = group_members(
            CatalogKind::Position,
            vec![("P1".into(), "Trưởng phòng".into())],
            vec![member("E1", "D1", "P1"), member("E2", "D2", "P1"), member("E3", "D1", "P2")],
        );

        let ids: Vec<_> = groups[0].members.iter().map(|m| m.employee_id.as_str()).collect();
        assert_eq!(ids, ["E1", "E2"]);
    }
}
