use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::AppState;

/// The acting user, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Resolves the bearer token in `headers`, if any.
///
/// `Ok(None)` means no session was presented; a token that is present but
/// invalid is an error.
pub fn authenticate(headers: &HeaderMap, config: &Config) -> AppResult<Option<AuthUser>> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let token_data = verify_token(token, config)?;

    Ok(Some(AuthUser {
        id: token_data.claims.sub,
        email: token_data.claims.email.filter(|e| !e.is_empty()),
    }))
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(req.headers(), &state.config)?.ok_or(AppError::Unauthorized)?;

    tracing::debug!(user_id = %auth_user.id, "Request authenticated");
    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}
