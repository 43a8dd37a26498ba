use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::types::Uuid;

use crate::db::models::UserRole;
use crate::error::AppError;

/// Identity of the caller, resolved by the upstream auth layer and forwarded
/// in headers. This service trusts the identity but re-derives authorization
/// per operation; the role claim is never used for fee decisions.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedActor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Uuid>().ok())
            .ok_or_else(|| AppError::Authentication("Missing or invalid user identity".into()))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<UserRole>().ok())
            .ok_or_else(|| AppError::Authentication("Missing or invalid user role".into()))?;

        Ok(AuthenticatedActor { user_id, role })
    }
}
