use crate::{
    auth::auth::AuthUser,
    models::{Claims, TokenType},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims_for(user: &AuthUser, token_type: TokenType, ttl: usize) -> Claims {
    Claims {
        sub: user.username.clone(),
        employee_id: user.employee_id.clone(),
        name: user.name.clone(),
        role: user.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

pub fn generate_access_token(user: &AuthUser, secret: &str, ttl: usize) -> Result<String, Error> {
    let claims = claims_for(user, TokenType::Access, ttl);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_refresh_token(
    user: &AuthUser,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims_for(user, TokenType::Refresh, ttl);

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user() -> AuthUser {
        AuthUser {
            employee_id: "ID001".into(),
            username: "admin".into(),
            name: "Jane Admin".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn access_token_round_trips_the_session() {
        let token = generate_access_token(&user(), "secret", 900).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(AuthUser::from(claims), user());
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let (_, a) = generate_refresh_token(&user(), "secret", 60).unwrap();
        let (_, b) = generate_refresh_token(&user(), "secret", 60).unwrap();
        assert_eq!(a.token_type, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&user(), "secret", 900).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
