use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::work_entry::{CreateWorkEntryRequest, EntryQuery, WorkEntry};
use crate::AppState;

pub async fn create_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateWorkEntryRequest>,
) -> AppResult<(StatusCode, Json<WorkEntry>)> {
    body.validate()?;

    let entry = body.into_entry(Utc::now());
    let saved = state.store.save(auth_user.id, entry).await?;

    tracing::info!(
        user_id = %auth_user.id,
        pieces = saved.pieces,
        session = %saved.session,
        date = %saved.date,
        "Work entry saved"
    );

    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<EntryQuery>,
) -> AppResult<Json<Vec<WorkEntry>>> {
    let entries = match query.date {
        Some(date) => state.store.list_by_date(auth_user.id, date).await?,
        None => state.store.list_all(auth_user.id).await?,
    };

    Ok(Json(entries))
}

/// Entries for the current UTC date.
pub async fn list_today(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<WorkEntry>>> {
    let today = Utc::now().date_naive();
    let entries = state.store.list_by_date(auth_user.id, today).await?;
    Ok(Json(entries))
}
