use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;

/// The authenticated session behind a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, actix_web::Error> {
    // Set by auth_middleware on protected scopes.
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorUnauthorized("Missing token"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Config missing"))?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ErrorUnauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Access {
        return Err(ErrorUnauthorized("Access token required"));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ErrorUnauthorized("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.is_console_user() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// Employee id for self-service endpoints (check-in, leave requests).
    pub fn require_employee_profile(&self) -> actix_web::Result<&str> {
        self.employee_id
            .as_deref()
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
    }
}
