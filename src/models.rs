use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "hr@company.vn")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = 2)]
    pub role_id: u8,
    /// Links the account to an employee profile (needed for check-in/out).
    pub employee_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "hr@company.vn")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(FromRow)]
pub struct UserSql {
    pub id: u64, // BIGINT UNSIGNED
    pub email: String,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
