//! Session middleware: bearer-token authentication and role checks.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use paytrack_types::{AuthError, Claims, Repository, Role, UserId};

use super::handlers::AppState;
use super::response::ApiError;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingAuthorization.into())
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingAuthorization)?;
    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthorizationFormat),
    }
}

/// Rejects requests without a valid access token.
pub async fn require_auth<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());

    let claims = match bearer_token(header).and_then(|t| state.auth.validate_token(t)) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    request.extensions_mut().insert(CurrentUser::from(claims));
    next.run(request).await
}

/// Rejects authenticated callers that are not admins. Runs after
/// [`require_auth`].
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>() {
        Some(user) if user.role == Role::Admin => next.run(request).await,
        Some(_) => ApiError::from(AuthError::AdminRequired).into_response(),
        None => ApiError::from(AuthError::MissingAuthorization).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn test_bearer_token_missing() {
        assert!(matches!(
            bearer_token(None),
            Err(AuthError::MissingAuthorization)
        ));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        for header in ["Basic abc", "abc", "Bearer", "Bearer  ", ""] {
            assert!(
                matches!(
                    bearer_token(Some(header)),
                    Err(AuthError::InvalidAuthorizationFormat)
                ),
                "{header:?} should be rejected"
            );
        }
    }
}
