use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;

/// Header carrying the identity-provider uid of the caller.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Opaque uid of the signed-in caller. Extracting it rejects with 401 when
/// the header is missing or blank; use `Option<Identity>` for optional auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn uid(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(|uid| Identity(uid.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}
