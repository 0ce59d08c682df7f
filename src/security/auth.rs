use crate::api::rest::ApiError;
use crate::error::Error;
use crate::security::{Claims, SecurityService};
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use log::debug;
use std::sync::Arc;

/// The identified caller of a request
///
/// Extracting it is the first thing every protected handler does, so a request
/// without a valid bearer token is answered with 401 before its body is read.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<SecurityService>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let security = Arc::<SecurityService>::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Unauthorized("Missing bearer token".to_string()))?;

        let data = security.validate_token(token).map_err(|e| {
            debug!("Rejected caller: {}", e);
            e
        })?;

        Ok(CurrentUser(data.claims))
    }
}
