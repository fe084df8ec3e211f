use crate::{
    application::lifecycle::dto::StageDuplicate,
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub origin: String,
}

/// Keys of `origin` present in more than one stage store.
pub async fn list_stage_duplicates(
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<StageDuplicate>>, AppError> {
    let duplicates = state
        .lifecycle
        .find_cross_stage_duplicates(&params.origin)
        .await?;
    if !duplicates.is_empty() {
        tracing::warn!(
            origin = %params.origin,
            count = duplicates.len(),
            "Cross-stage duplicates found"
        );
    }
    Ok(Json(duplicates))
}
