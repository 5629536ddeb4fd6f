use actix_web::{Responder, web};
use sqlx::MySqlPool;

use crate::api::catalog::{self, CatalogGroup, CatalogKind, NameBody};
use crate::auth::auth::AuthUser;
use crate::utils::catalog_cache::CatalogCache;

/// Departments with their actively assigned employees
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments and members", body = [CatalogGroup])
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let groups = catalog::list_with_members(CatalogKind::Department, pool.get_ref()).await?;
    Ok(web::Json(groups))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = NameBody,
    responses(
        (status = 201, description = "Department created", body = Object, example = json!({
            "id": "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e",
            "name": "Phòng Kỹ thuật"
        })),
        (status = 400, description = "Blank name")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    body: web::Json<NameBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    catalog::create(CatalogKind::Department, &pool, &cache, body.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/api/departments/{department_id}",
    params(
        ("department_id" = String, Path, description = "Department ID")
    ),
    request_body = NameBody,
    responses(
        (status = 200, description = "Department renamed"),
        (status = 400, description = "Blank name"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    path: web::Path<String>,
    body: web::Json<NameBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    catalog::rename(
        CatalogKind::Department,
        &pool,
        &cache,
        path.into_inner(),
        body.into_inner(),
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/api/departments/{department_id}",
    params(
        ("department_id" = String, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still has assignments")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    catalog::delete(CatalogKind::Department, &pool, &cache, path.into_inner()).await
}
