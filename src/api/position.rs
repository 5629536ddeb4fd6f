use actix_web::{Responder, web};
use sqlx::MySqlPool;

use crate::api::catalog::{self, CatalogGroup, CatalogKind, NameBody};
use crate::auth::auth::AuthUser;
use crate::utils::catalog_cache::CatalogCache;

/// Positions with their actively assigned employees
#[utoipa::path(
    get,
    path = "/api/positions",
    responses(
        (status = 200, description = "Positions and members", body = [CatalogGroup])
    ),
    tag = "Position",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_positions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let groups = catalog::list_with_members(CatalogKind::Position, pool.get_ref()).await?;
    Ok(web::Json(groups))
}

#[utoipa::path(
    post,
    path = "/api/positions",
    request_body = NameBody,
    responses(
        (status = 201, description = "Position created", body = Object, example = json!({
            "id": "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e",
            "name": "Trưởng phòng"
        })),
        (status = 400, description = "Blank name")
    ),
    tag = "Position",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    body: web::Json<NameBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    catalog::create(CatalogKind::Position, &pool, &cache, body.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/api/positions/{position_id}",
    params(
        ("position_id" = String, Path, description = "Position ID")
    ),
    request_body = NameBody,
    responses(
        (status = 200, description = "Position renamed"),
        (status = 400, description = "Blank name"),
        (status = 404, description = "Position not found")
    ),
    tag = "Position",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    path: web::Path<String>,
    body: web::Json<NameBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    catalog::rename(
        CatalogKind::Position,
        &pool,
        &cache,
        path.into_inner(),
        body.into_inner(),
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/api/positions/{position_id}",
    params(
        ("position_id" = String, Path, description = "Position ID")
    ),
    responses(
        (status = 200, description = "Position deleted"),
        (status = 404, description = "Position not found"),
        (status = 409, description = "Position still has assignments")
    ),
    tag = "Position",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    catalog::delete(CatalogKind::Position, &pool, &cache, path.into_inner()).await
}
