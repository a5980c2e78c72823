//! Caller identity resolution.
//!
//! Authentication itself happens upstream; this service receives the opaque
//! resolved user id in the `x-user-id` header. The identity middleware
//! validates the header and stores a `CallerIdentity` in request extensions
//! for handlers to extract.

use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::http::{request::Parts, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, as resolved by the upstream auth layer.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(unauthorized)
    }
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(
            "Authentication required",
            "UNAUTHORIZED",
        )),
    )
}

/// Rejects requests without a valid resolved user id.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok());

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(CallerIdentity { user_id });
            next.run(request).await
        }
        None => unauthorized().into_response(),
    }
}
