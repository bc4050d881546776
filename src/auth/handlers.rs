use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, validate_new_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult},
    model::role::Role,
    models::{Claims, CredentialSql, LoginReqDto, SessionSql, TokenType},
    store::employee as employee_store,
    utils::{
        change_feed::{ChangeFeed, Table},
        username_cache,
    },
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "ID001")]
    pub employee_id: String,
    #[schema(example = "Jane Admin")]
    pub name: String,
    pub role: Role,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordReq {
    #[schema(example = "new-secret")]
    pub new_password: String,
    #[schema(example = "new-secret")]
    pub confirm_password: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(e).context("Failed to sign token"))
}

async fn store_refresh_token<'c, E>(executor: E, claims: &Claims) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'c, Database = sqlx::MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (employee_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(&claims.employee_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(executor)
    .await?;
    Ok(())
}

/// Session for a refresh, built from the account as it is now. Deleted
/// accounts and accounts without a username lose their session.
fn current_session(row: Option<SessionSql>) -> AppResult<AuthUser> {
    let row = row.ok_or(AppError::Unauthorized("Account no longer exists"))?;
    let username = row
        .username
        .ok_or(AppError::Unauthorized("Account can no longer sign in"))?;

    Ok(AuthUser {
        employee_id: row.id,
        username,
        name: row.name,
        role: Role::from_str(&row.role).unwrap_or(Role::User),
    })
}

/// Access token plus a stored refresh token for `user`.
async fn issue_tokens(
    user: &AuthUser,
    pool: &MySqlPool,
    config: &Config,
) -> AppResult<(String, String)> {
    let access_token = generate_access_token(user, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool, &refresh_claims).await?;

    Ok((access_token, refresh_token))
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        }))
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation("Username or password required"));
    }

    let credential = sqlx::query_as::<_, CredentialSql>(
        r#"
        SELECT id, username, name, role, password_hash
        FROM employees
        WHERE LOWER(username) = LOWER(?)
        "#,
    )
    .bind(username)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        AppError::Unauthorized("Invalid credentials")
    })?;

    let hash = credential.password_hash.as_deref().ok_or_else(|| {
        info!("Invalid credentials: no password set");
        AppError::Unauthorized("Invalid credentials")
    })?;

    if let Err(e) = verify_password(&user.password, hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    let session = AuthUser {
        employee_id: credential.id,
        username: credential.username,
        name: credential.name,
        role: Role::from_str(&credential.role).unwrap_or(Role::User),
    };

    let (access_token, refresh_token) =
        issue_tokens(&session, pool.get_ref(), config.get_ref()).await?;

    if let Err(e) = sqlx::query("UPDATE employees SET last_login_at = NOW() WHERE id = ?")
        .bind(&session.employee_id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(employee_id = %session.employee_id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        employee_id: session.employee_id,
        name: session.name,
        role: session.role,
    }))
}

/// Rotate the refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = Object, example = json!({
            "access_token": "eyJ...",
            "refresh_token": "eyJ..."
        })),
        (status = 401, description = "Missing, invalid or revoked refresh token")
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
) -> AppResult<HttpResponse> {
    let token = bearer(&req).ok_or(AppError::Unauthorized("Missing token"))?;

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return Err(AppError::Unauthorized("Invalid token")),
    };

    let mut tx = pool.begin().await?;

    let revoked = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ? AND revoked = 0")
        .bind(&claims.jti)
        .execute(&mut *tx)
        .await?;

    if revoked.rows_affected() == 0 {
        info!(jti = %claims.jti, "Refresh with unknown or revoked token");
        return Err(AppError::Unauthorized("Invalid token"));
    }

    let account = sqlx::query_as::<_, SessionSql>(
        "SELECT id, username, name, role FROM employees WHERE id = ?",
    )
    .bind(&claims.employee_id)
    .fetch_optional(&mut *tx)
    .await?;

    let session = current_session(account).inspect_err(|_| {
        info!(employee_id = %claims.employee_id, "Refresh for a removed account");
    })?;
    if session.role != claims.role {
        info!(employee_id = %session.employee_id, role = %session.role, "Role changed since last refresh");
    }

    let access_token = generate_access_token(&session, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;
    let (new_refresh_token, new_claims) =
        generate_refresh_token(&session, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    store_refresh_token(&mut *tx, &new_claims).await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Logout
///
/// Revokes the refresh token sent as the bearer. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    info!(employee_id = %claims.employee_id, "Logged out");
    HttpResponse::NoContent().finish()
}

/// Seed demo employees into an empty database
#[utoipa::path(
    post,
    path = "/auth/bootstrap",
    responses(
        (status = 200, description = "Seeding result", body = Object, example = json!({
            "seeded": true
        }))
    ),
    tag = "Auth"
)]
pub async fn bootstrap(
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
) -> AppResult<HttpResponse> {
    let seeded = employee_store::seed_if_empty(pool.get_ref())
        .await
        .map_err(AppError::Internal)?;

    if seeded {
        username_cache::warmup_username_cache(pool.get_ref(), 100)
            .await
            .unwrap_or_else(|e| error!(error = %e, "Username cache warmup failed"));
        feed.publish(Table::Employees);
    }

    Ok(HttpResponse::Ok().json(json!({ "seeded": seeded })))
}

/// Change own password
#[utoipa::path(
    put,
    path = "/api/profile/password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "message": "Password changed"
        })),
        (status = 400, description = "Too short or confirmation mismatch", body = Object, example = json!({
            "message": "Passwords do not match"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ChangePasswordReq>,
) -> AppResult<HttpResponse> {
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let hashed = hash_password(&payload.new_password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AppError::validation("Password could not be processed")
    })?;

    let result = sqlx::query("UPDATE employees SET password_hash = ? WHERE id = ?")
        .bind(hashed)
        .bind(&auth.employee_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Employee not found"));
    }

    info!(employee_id = %auth.employee_id, "Password changed");
    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_requires_the_prefix() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer(&req), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Token abc.def"))
            .to_http_request();
        assert_eq!(bearer(&req), None);

        assert_eq!(bearer(&TestRequest::default().to_http_request()), None);
    }

    fn account(role: &str) -> SessionSql {
        SessionSql {
            id: "ID002".into(),
            username: Some("mai".into()),
            name: "Mai".into(),
            role: role.into(),
        }
    }

    #[test]
    fn refresh_picks_up_the_current_role() {
        let session = current_session(Some(account("User"))).unwrap();
        assert_eq!(session.role, Role::User);
        assert_eq!(session.username, "mai");

        let session = current_session(Some(account("Admin"))).unwrap();
        assert_eq!(session.role, Role::Admin);
    }

    #[test]
    fn removed_accounts_cannot_refresh() {
        assert!(matches!(current_session(None), Err(AppError::Unauthorized(_))));

        let mut no_login = account("User");
        no_login.username = None;
        assert!(matches!(
            current_session(Some(no_login)),
            Err(AppError::Unauthorized(_))
        ));
    }
}
