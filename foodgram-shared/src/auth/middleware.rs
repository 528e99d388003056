/// Identity middleware and current-user extractor for axum
///
/// The middleware looks at `Authorization`. A valid token inserts an
/// [`AuthContext`] into request extensions; an invalid one rejects the
/// request with 401; a missing header lets the request through anonymously.
/// Handlers decide per operation whether a user is required:
///
/// ```no_run
/// use foodgram_shared::auth::middleware::AuthContext;
///
/// // 401 when nobody is logged in
/// async fn private(auth: AuthContext) -> String {
///     format!("user {}", auth.user_id)
/// }
///
/// // anonymous viewers allowed
/// async fn public(viewer: Option<AuthContext>) -> String {
///     viewer.map(|v| v.user_id.to_string()).unwrap_or_default()
/// }
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{future::Future, pin::Pin, sync::Arc};

use super::jwt::{validate_token, JwtError};

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
}

impl AuthContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

#[derive(Debug)]
pub enum AuthError {
    /// No credentials on a request that needs them
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Token failed validation
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::UNAUTHORIZED, msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, Json(json!({ "errors": message }))).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

/// Extracts the token from an `Authorization` header value
///
/// Accepts `Bearer <token>` and the legacy `Token <token>` scheme.
pub fn parse_authorization(value: &str) -> Result<&str, AuthError> {
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Verifies the bearer token when one is present
pub async fn identity_middleware(
    secret: Arc<str>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(header_value) = req.headers().get(header::AUTHORIZATION).cloned() else {
        return Ok(next.run(req).await);
    };

    let header_value = header_value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not ASCII".to_string()))?;
    let token = parse_authorization(header_value)?;

    let claims = validate_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
        other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
    })?;

    tracing::debug!(user_id = claims.sub, "Authenticated request");
    req.extensions_mut().insert(AuthContext::new(claims.sub));

    Ok(next.run(req).await)
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Captures the secret and returns a closure for `axum::middleware::from_fn`
pub fn create_identity_middleware(
    secret: impl Into<Arc<str>>,
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
    let secret: Arc<str> = secret.into();
    move |req: Request, next: Next| -> MiddlewareFuture {
        Box::pin(identity_middleware(secret.clone(), req, next))
    }
}
