use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::summary::DailySummary;
use crate::services::aggregator;
use crate::AppState;

pub async fn list_summaries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<DailySummary>>> {
    let entries = state.store.list_all(auth_user.id).await?;
    Ok(Json(aggregator::group_by_date(entries)))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<DailySummary>> {
    let entries = state.store.list_by_date(auth_user.id, date).await?;

    aggregator::summary_for_date(entries, date)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No entries for {}", date)))
}
