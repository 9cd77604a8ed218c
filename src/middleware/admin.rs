// src/middleware/admin.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::{ApiError, AppError},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::User,
};

/// Guardião das rotas administrativas. Depende do `auth_guard` já ter rodado.
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::warn!("⛔ Acesso administrativo negado para {}", user.email);
            return Err(AppError::AdminRequired.to_api_error(&Locale::from_parts(parts)));
        }

        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use uuid::Uuid;

    fn user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Maria".into(),
            email: "maria@exemplo.com".into(),
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn parts_with(user: Option<User>) -> Parts {
        let (mut parts, _) = Request::builder().uri("/api/users").body(()).unwrap().into_parts();
        if let Some(user) = user {
            parts.extensions.insert(user);
        }
        parts
    }

    #[tokio::test]
    async fn admin_passes() {
        let mut parts = parts_with(Some(user(true)));
        let RequireAdmin(admin) = RequireAdmin::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(admin.is_admin);
    }

    #[tokio::test]
    async fn regular_user_is_forbidden() {
        let mut parts = parts_with(Some(user(false)));
        let err = RequireAdmin::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let mut parts = parts_with(None);
        let err = RequireAdmin::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
