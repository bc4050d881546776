use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::{Value, json};

fn reject(req: ServiceRequest, body: Value) -> ServiceResponse<BoxBody> {
    req.into_response(HttpResponse::Unauthorized().json(body).map_into_boxed_body())
}

/// Resolves the bearer access token into an `AuthUser` request extension.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = match req.headers().get("Authorization").map(|h| h.to_str()) {
        None => return Ok(reject(req, json!({"message": "Missing Authorization header"}))),
        Some(Err(_)) => {
            return Ok(reject(
                req,
                json!({"message": "Invalid Authorization header encoding"}),
            ));
        }
        Some(Ok(value)) => match value.strip_prefix("Bearer ") {
            Some(t) => t.to_owned(),
            None => {
                return Ok(reject(
                    req,
                    json!({"message": "Authorization header must start with Bearer"}),
                ));
            }
        },
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Access => c,
        Ok(_) => {
            return Ok(reject(
                req,
                json!({"message": "Refresh tokens cannot be used here"}),
            ));
        }
        Err(details) => {
            return Ok(reject(
                req,
                json!({"message": "Invalid or expired token", "details": details}),
            ));
        }
    };

    let auth_user = AuthUser::from(claims);
    tracing::debug!(employee_id = %auth_user.employee_id, role = %auth_user.role, "Authenticated");

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
