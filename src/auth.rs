use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{AuthorizationRecord, Identity, Role},
};

/// CurrentUser Extractor Result
///
/// The identity the access gate resolved for this request. The gate inserts it into the
/// request extensions before forwarding; handlers take it as an argument instead of reading
/// any shared auth state.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Rejection: 401 when the request carried no valid session.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<Identity>()
            .ok_or(ApiError::Unauthenticated)?;

        Ok(CurrentUser {
            id: identity.id,
            email: identity.email.clone(),
        })
    }
}

/// AdminUser Extractor Result
///
/// An identity whose role record, fetched by the gate for this request, is `Admin`.
/// Admin handlers take this rather than `CurrentUser` so a routing mistake that bypasses
/// the gate still cannot reach them.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        match parts.extensions.get::<AuthorizationRecord>() {
            Some(record) if record.identity_id == user.id && record.role == Role::Admin => {
                Ok(AdminUser { id: user.id })
            }
            _ => Err(ApiError::Forbidden),
        }
    }
}
