use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{authenticate, AuthUser};
use crate::auth::session::{route_decision, AuthState, RouteDecision, HOME_PATH};
use crate::error::AppResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub async fn me(Extension(auth_user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.id,
        email: auth_user.email,
    })
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub decision: RouteDecision,
}

/// Session-presence check. Never fails on a bad token: an invalid session is
/// reported as signed out.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<SessionResponse>> {
    let auth_state = match authenticate(&headers, &state.config) {
        Ok(Some(user)) => AuthState::Authenticated(user),
        Ok(None) | Err(_) => AuthState::Unauthenticated,
    };

    let path = query.path.as_deref().unwrap_or(HOME_PATH);
    let decision = route_decision(&auth_state, path);

    Ok(Json(SessionResponse {
        authenticated: auth_state.user().is_some(),
        user_id: auth_state.user().map(|u| u.id),
        decision,
    }))
}
