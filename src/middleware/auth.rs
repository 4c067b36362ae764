//! Caller identity middleware.
//!
//! Authentication happens upstream. The gateway forwards the verified user
//! id in the `X-User-Id` header and this middleware only reads it:
//! 1. Extract the header
//! 2. Parse it as a UUID
//! 3. Inject [`AuthContext`] into the request
//! 4. Reject the request with HTTP 401 if either step fails

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity attached to every request under `/api/v1`.
///
/// Handlers extract it with `Extension<AuthContext>` and pass `user_id` to
/// the services, which scope every lookup by it.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
}

pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AppError::MissingIdentity)?;

    request.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(request).await)
}
