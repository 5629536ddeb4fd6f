use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::api::employee::MySqlAssignmentStore;
use crate::auth::auth::AuthUser;
use crate::model::assignment::AssignmentKey;
use crate::service::assignment::{AssignmentChange, AssignmentStore, ChangeOutcome};
use crate::service::operation::OperationStatus;
use crate::utils::catalog_cache::{Catalog, CatalogCache};
use crate::utils::validation::invalid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAssignment {
    #[schema(example = "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e")]
    pub employee_id: String,
    #[schema(example = "d-01")]
    pub department_id: String,
    #[schema(example = "p-01")]
    pub position_id: String,
    pub active: bool,
}

/// Departments and positions for the assignment picker
#[utoipa::path(
    get,
    path = "/api/catalog",
    responses(
        (status = 200, description = "Catalog", body = Catalog)
    ),
    tag = "Assignment",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_catalog(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let catalog = cache.get(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load catalog");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(catalog.as_ref()))
}

/// Activate or deactivate a single assignment
#[utoipa::path(
    put,
    path = "/api/assignment",
    request_body = SetAssignment,
    responses(
        (status = 200, description = "Assignment updated", body = ChangeOutcome),
        (status = 400, description = "Unknown department or position"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Assignment",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<CatalogCache>,
    body: web::Json<SetAssignment>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let SetAssignment {
        employee_id,
        department_id,
        position_id,
        active,
    } = body.into_inner();
    let change = AssignmentChange {
        key: AssignmentKey::new(department_id, position_id),
        active,
    };

    let catalog = cache.get(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load catalog");
        ErrorInternalServerError("Internal Server Error")
    })?;
    catalog.check(&change.key).map_err(invalid)?;

    let store = MySqlAssignmentStore { pool: pool.get_ref() };
    match store.set_active(&employee_id, &change).await {
        Ok(()) => {
            info!(%employee_id, key = %change.key, active, "Assignment updated");
            Ok(HttpResponse::Ok().json(ChangeOutcome {
                department_id: change.key.department_id,
                position_id: change.key.position_id,
                active,
                status: OperationStatus::Succeeded,
            }))
        }

        // foreign key on employees
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found"
            })))
        }

        Err(e) => {
            error!(error = %e, %employee_id, key = %change.key, "Assignment update failed");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, issue_token};
    use crate::config::Config;
    use crate::model::department::Department;
    use crate::model::position::Position;
    use crate::models::TokenType;
    use actix_web::{App, http::StatusCode, test};
    use sqlx::mysql::MySqlPoolOptions;
    use std::time::Duration;

    fn bearer() -> String {
        let subject = TokenSubject {
            user_id: 1,
            email: "hr@company.vn".into(),
            role: 2,
            employee_id: None,
        };
        let (token, _) =
            issue_token(&subject, TokenType::Access, &Config::for_tests().jwt_secret, 60).unwrap();
        format!("Bearer {token}")
    }

    async fn primed_cache() -> CatalogCache {
        let cache = CatalogCache::new(Duration::from_secs(60));
        cache
            .prime(Catalog {
                departments: vec![Department {
                    department_id: "D1".into(),
                    department_name: "Kỹ thuật".into(),
                }],
                positions: vec![Position {
                    position_id: "P1".into(),
                    position_name: "Trưởng phòng".into(),
                }],
            })
            .await;
        cache
    }

    // The pool is never connected: these requests are answered from the cache.
    fn idle_pool() -> MySqlPool {
        MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    #[actix_web::test]
    async fn catalog_is_served_from_cache() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(idle_pool()))
                .app_data(web::Data::new(primed_cache().await))
                .route("/catalog", web::get().to(get_catalog)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/catalog")
            .insert_header(("Authorization", bearer()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["departments"][0]["department_id"], "D1");
        assert_eq!(body["positions"][0]["position_name"], "Trưởng phòng");
    }

    #[actix_web::test]
    async fn unknown_position_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(idle_pool()))
                .app_data(web::Data::new(primed_cache().await))
                .route("/assignment", web::put().to(set_assignment)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/assignment")
            .insert_header(("Authorization", bearer()))
            .set_json(json!({
                "employee_id": "E1",
                "department_id": "D1",
                "position_id": "P9",
                "active": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
