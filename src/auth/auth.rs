use crate::{auth::jwt::verify_token, config::Config, error::AppError, model::role::Role, models::TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The signed-in session. Built from the access token on every request and
/// never mutated; logging in issues a new one, logging out discards it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub employee_id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
}

/// Which employees' data a session may select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Organization,
    Employee(String),
}

impl Scope {
    pub fn admits(&self, employee_id: &str) -> bool {
        match self {
            Scope::Organization => true,
            Scope::Employee(own) => own == employee_id,
        }
    }

    /// The single employee this scope is pinned to, if any.
    pub fn employee_id(&self) -> Option<&str> {
        match self {
            Scope::Organization => None,
            Scope::Employee(id) => Some(id),
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // auth_middleware already decoded the token for protected routes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(AppError::Unauthorized("Missing token").into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) if c.token_type == TokenType::Access => c,
            _ => return ready(Err(AppError::Unauthorized("Invalid token").into())),
        };

        ready(Ok(AuthUser::from(claims)))
    }
}

impl From<crate::models::Claims> for AuthUser {
    fn from(claims: crate::models::Claims) -> Self {
        AuthUser {
            employee_id: claims.employee_id,
            username: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only"))
        }
    }

    pub fn scope(&self) -> Scope {
        if self.is_admin() {
            Scope::Organization
        } else {
            Scope::Employee(self.employee_id.clone())
        }
    }

    /// Resolves the employee a request is about. Admins may name anyone
    /// (defaulting to themselves); everybody else only themselves.
    pub fn resolve_employee(&self, requested: Option<&str>) -> Result<String, AppError> {
        match requested {
            None => Ok(self.employee_id.clone()),
            Some(id) if self.scope().admits(id) => Ok(id.to_string()),
            Some(_) => Err(AppError::Forbidden("You can only access your own attendance")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            employee_id: "ID002".into(),
            username: "user".into(),
            name: "User".into(),
            role,
        }
    }

    #[test]
    fn non_admin_scope_is_pinned_to_self() {
        let scope = user(Role::User).scope();
        assert_eq!(scope, Scope::Employee("ID002".into()));
        assert!(scope.admits("ID002"));
        assert!(!scope.admits("ID001"));
        assert_eq!(scope.employee_id(), Some("ID002"));
    }

    #[test]
    fn admin_scope_is_organization() {
        let scope = user(Role::Admin).scope();
        assert!(scope.admits("anyone"));
        assert_eq!(scope.employee_id(), None);
    }

    #[test]
    fn resolve_employee_enforces_scope() {
        let u = user(Role::User);
        assert_eq!(u.resolve_employee(None).unwrap(), "ID002");
        assert_eq!(u.resolve_employee(Some("ID002")).unwrap(), "ID002");
        assert!(matches!(
            u.resolve_employee(Some("ID001")),
            Err(AppError::Forbidden(_))
        ));

        let admin = user(Role::Admin);
        assert_eq!(admin.resolve_employee(Some("ID001")).unwrap(), "ID001");
        assert!(admin.require_admin().is_ok());
        assert!(u.require_admin().is_err());
    }
}
