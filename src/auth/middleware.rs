use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;

fn reject(req: ServiceRequest, body: serde_json::Value) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map(str::to_string))
    {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            return Ok(reject(
                req,
                json!({"error": "Invalid Authorization header encoding"}),
            ));
        }
        None => return Ok(reject(req, json!({"error": "Missing Authorization header"}))),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(reject(
            req,
            json!({"error": "Authorization header must start with Bearer"}),
        ));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            return Ok(reject(
                req,
                json!({"error": "Invalid or expired token", "details": e}),
            ));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(reject(req, json!({"error": "Access token required"})));
    }

    let Some(role) = Role::from_id(claims.role) else {
        return Ok(reject(req, json!({"error": "Invalid role"})));
    };

    debug!(user_id = claims.user_id, ?role, path = %req.path(), "Authenticated request");

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role,
        employee_id: claims.employee_id,
    });

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, issue_token};
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.email)
    }

    fn token(token_type: TokenType, role: u8) -> String {
        let subject = TokenSubject {
            user_id: 1,
            email: "admin@company.vn".into(),
            role,
            employee_id: None,
        };
        issue_token(&subject, token_type, &Config::for_tests().jwt_secret, 60)
            .unwrap()
            .0
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new().app_data(Data::new(Config::for_tests())).service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/me", web::get().to(whoami)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let app = app!();
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn refresh_tokens_cannot_call_the_api() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token(TokenType::Refresh, 1))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn unknown_role_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token(TokenType::Access, 9))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_access_token_reaches_the_handler() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token(TokenType::Access, 1))))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, actix_web::web::Bytes::from_static(b"admin@company.vn"));
    }
}
