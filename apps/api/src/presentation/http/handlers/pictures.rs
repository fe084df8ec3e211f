use crate::{
    domain::{
        picture::{
            entity::{BoundingBox, Picture, PictureFilter, PictureKey},
            stage::Stage,
        },
        shared::pagination::PaginationRequest,
    },
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// `{stage}/pictures/{origin}/{name}` path segments.
pub type PicturePath = Path<(String, String, String)>;

pub(super) fn resolve(
    (stage, origin, name): (String, String, String),
) -> Result<(Stage, PictureKey), AppError> {
    let stage = stage.parse::<Stage>()?;
    let key = PictureKey::new(origin, name)?;
    Ok((stage, key))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub origin: String,
    #[serde(default)]
    pub origin_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_pictures(
    State(state): State<AppState>,
    Path(stage): Path<String>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Picture>>, AppError> {
    let stage = stage.parse::<Stage>()?;
    let filter = PictureFilter {
        origin_id: params.origin_id,
        pagination: PaginationRequest {
            limit: params.limit,
            offset: params.offset,
        },
    };
    let pictures = state.lifecycle.list(stage, &params.origin, &filter).await?;
    Ok(Json(pictures))
}

pub async fn create_picture(
    State(state): State<AppState>,
    Path(stage): Path<String>,
    Json(picture): Json<Picture>,
) -> Result<(StatusCode, Json<Picture>), AppError> {
    let stage = stage.parse::<Stage>()?;
    let created = state.lifecycle.create(stage, picture).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Multipart upload: a `picture` field holding the record as JSON and a
/// `file` field holding the raster bytes.
pub async fn upload_picture(
    State(state): State<AppState>,
    Path(stage): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Picture>), AppError> {
    let stage = stage.parse::<Stage>()?;
    let mut picture: Option<Picture> = None;
    let mut raster = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "picture" => picture = Some(serde_json::from_slice(&field.bytes().await?)?),
            "file" => raster = Some(field.bytes().await?),
            _ => {}
        }
    }

    let picture = picture.ok_or(AppError::BadRequest("Missing picture field".into()))?;
    let raster = raster
        .filter(|b| !b.is_empty())
        .ok_or(AppError::BadRequest("Missing file field".into()))?;

    tracing::info!(
        key = %picture.key(),
        size = raster.len(),
        "Upload received"
    );
    let created = state
        .lifecycle
        .create_with_blob(stage, picture, raster.to_vec())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_picture(
    State(state): State<AppState>,
    Path(path): PicturePath,
) -> Result<Json<Picture>, AppError> {
    let (stage, key) = resolve(path)?;
    Ok(Json(state.lifecycle.read(stage, &key).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub with_blob: bool,
}

pub async fn delete_picture(
    State(state): State<AppState>,
    Path(path): PicturePath,
    Query(params): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    let (stage, key) = resolve(path)?;
    if params.with_blob {
        state.lifecycle.delete_with_blob(stage, &key).await?;
    } else {
        state.lifecycle.delete(stage, &key).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to: Stage,
}

pub async fn transfer_picture(
    State(state): State<AppState>,
    Path(path): PicturePath,
    Json(body): Json<TransferRequest>,
) -> Result<Json<Picture>, AppError> {
    let (stage, key) = resolve(path)?;
    Ok(Json(state.lifecycle.transfer(stage, body.to, &key).await?))
}

pub async fn duplicate_picture(
    State(state): State<AppState>,
    Path(path): PicturePath,
) -> Result<(StatusCode, Json<Picture>), AppError> {
    let (stage, key) = resolve(path)?;
    let copy = state.lifecycle.duplicate(stage, &key).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

pub async fn block_picture(
    State(state): State<AppState>,
    Path(path): PicturePath,
) -> Result<Json<Picture>, AppError> {
    let (stage, key) = resolve(path)?;
    Ok(Json(state.lifecycle.block(stage, &key).await?))
}

pub async fn crop_picture(
    State(state): State<AppState>,
    Path(path): PicturePath,
    Json(crop): Json<BoundingBox>,
) -> Result<Json<Picture>, AppError> {
    let (stage, key) = resolve(path)?;
    if crop.is_empty() {
        return Err(AppError::ValidationError("Crop box has no area".into()));
    }
    Ok(Json(state.lifecycle.apply_crop(stage, &key, crop).await?))
}
