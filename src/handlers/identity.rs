//! Identity as handed over by the upstream auth layer.
//!
//! Authentication happens before requests reach this service; the gateway
//! forwards the verified user id and role in `X-User-Id` / `X-User-Role`.
//! Handlers that allow guests take `Option<Actor>`.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::BookingError;
use crate::models::{Actor, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, BookingError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(BookingError::Unauthorized)?;

    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or(BookingError::Unauthorized)?;

    Ok(Actor::new(user_id, role))
}

pub fn check_admin(headers: &HeaderMap, expected_token: &str) -> Result<(), BookingError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(BookingError::Unauthorized);
    }
    Ok(())
}
