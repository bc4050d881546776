use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "123")]
    pub password: String,
}

/// Login lookup row.
#[derive(FromRow)]
pub struct CredentialSql {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
    pub password_hash: Option<String>,
}

/// Account row re-read when a refresh token is rotated.
#[derive(FromRow)]
pub struct SessionSql {
    pub id: String,
    pub username: Option<String>,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// username
    pub sub: String,
    pub employee_id: String,
    pub name: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
