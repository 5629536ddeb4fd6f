use actix_web::{HttpRequest, HttpResponse, Responder, get, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, issue_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::role::Role,
    models::{Claims, LoginReqDto, RegisterReq, TokenType, UserSql},
};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access token and a persisted refresh token for `subject`.
async fn issue_session(
    subject: &TokenSubject,
    pool: &MySqlPool,
    config: &Config,
) -> Result<LoginResponse, HttpResponse> {
    let (access_token, _) = issue_token(
        subject,
        TokenType::Access,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        HttpResponse::InternalServerError().finish()
    })?;

    let (refresh_token, refresh_claims) = issue_token(
        subject,
        TokenType::Refresh,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    store_refresh_token(subject.user_id, &refresh_claims, pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store refresh token");
            HttpResponse::InternalServerError().finish()
        })?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

async fn store_refresh_token(
    user_id: u64,
    claims: &Claims,
    pool: &MySqlPool,
) -> Result<(), sqlx::Error> {
    debug!(user_id, jti = %claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Create a console or employee account (admin only)
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(auth, user, pool), fields(email = %user.email))]
pub async fn register(
    auth: AuthUser,
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Email and password must not be empty"
        })));
    }
    if Role::from_id(user.role_id).is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "Unknown role" })));
    }

    let hashed = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        r#"INSERT INTO users (email, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&email)
    .bind(hashed)
    .bind(user.role_id)
    .bind(user.employee_id.as_deref())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!("User registered");
            Ok(HttpResponse::Created().json(json!({
                "message": "User registered successfully"
            })))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Ok(HttpResponse::Conflict().json(json!({
                "error": "Email already registered"
            })))
        }
        Err(e) => {
            error!(error = %e, "Failed to register user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })))
        }
    }
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().body("Email or password required");
    }

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, email, password, role_id, employee_id
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(user.email.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        email: db_user.email,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };

    let session = match issue_session(&subject, pool.get_ref(), config.get_ref()).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(subject.user_id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");
    HttpResponse::Ok().json(session)
}

#[derive(sqlx::FromRow)]
struct RefreshRecord {
    id: u64,
    revoked: bool,
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let Some(token) = bearer(&req) else {
        return Ok(HttpResponse::Unauthorized().body("No token"));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let record = sqlx::query_as::<_, RefreshRecord>(
        "SELECT id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to look up refresh token");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let record = match record {
        Some(r) if !r.revoked => r,
        _ => {
            warn!(jti = %claims.jti, "Refresh with unknown or revoked token");
            return Ok(HttpResponse::Unauthorized().finish());
        }
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record.id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to revoke refresh token");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match issue_session(&TokenSubject::from(&claims), pool.get_ref(), config.get_ref()).await {
        Ok(session) => Ok(HttpResponse::Ok().json(session)),
        Err(resp) => Ok(resp),
    }
}

/// Revoke a refresh token (idempotent)
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    // only refresh tokens can end a session
    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[derive(Serialize, ToSchema)]
pub struct SessionInfo {
    pub user_id: u64,
    pub email: String,
    #[schema(example = 2)]
    pub role: u8,
    pub employee_id: Option<String>,
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[get("/me")]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(SessionInfo {
        user_id: auth.user_id,
        email: auth.email,
        role: auth.role.id(),
        employee_id: auth.employee_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};

    #[actix_web::test]
    async fn me_echoes_the_session() {
        let config = Config::for_tests();
        let subject = TokenSubject {
            user_id: 3,
            email: "nv@company.vn".into(),
            role: Role::Employee.id(),
            employee_id: Some("E3".into()),
        };
        let (token, _) = issue_token(&subject, TokenType::Access, &config.jwt_secret, 60).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .service(me),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["email"], "nv@company.vn");
        assert_eq!(body["role"], 3);
        assert_eq!(body["employee_id"], "E3");
    }

    #[actix_web::test]
    async fn me_without_token_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .service(me),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
