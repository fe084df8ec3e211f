use crate::{
    application::lifecycle::dto::TagRequest,
    presentation::http::{
        errors::AppError,
        handlers::pictures::{PicturePath, resolve},
        state::AppState,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCreated {
    pub tag_id: Uuid,
}

pub async fn create_tag(
    State(state): State<AppState>,
    Path(path): PicturePath,
    Json(request): Json<TagRequest>,
) -> Result<(StatusCode, Json<TagCreated>), AppError> {
    let (stage, key) = resolve(path)?;
    let tag_id = state.lifecycle.create_tag(stage, &key, request).await?;
    Ok((StatusCode::CREATED, Json(TagCreated { tag_id })))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path((stage, origin, name, tag_id)): Path<(String, String, String, Uuid)>,
    Json(request): Json<TagRequest>,
) -> Result<StatusCode, AppError> {
    let (stage, key) = resolve((stage, origin, name))?;
    state
        .lifecycle
        .update_tag(stage, &key, tag_id, request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path((stage, origin, name, tag_id)): Path<(String, String, String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let (stage, key) = resolve((stage, origin, name))?;
    state.lifecycle.delete_tag(stage, &key, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
