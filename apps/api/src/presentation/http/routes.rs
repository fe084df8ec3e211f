use super::{
    handlers::{audit, health, pictures, tags},
    middleware::request_id::request_id_middleware,
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Pictures per stage
        .route(
            "/api/v1/stages/{stage}/pictures",
            get(pictures::list_pictures).post(pictures::create_picture),
        )
        .route(
            "/api/v1/stages/{stage}/pictures/upload",
            post(pictures::upload_picture),
        )
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}",
            get(pictures::get_picture).delete(pictures::delete_picture),
        )
        // Lifecycle moves
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}/transfer",
            post(pictures::transfer_picture),
        )
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}/duplicate",
            post(pictures::duplicate_picture),
        )
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}/block",
            post(pictures::block_picture),
        )
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}/crop",
            post(pictures::crop_picture),
        )
        // Tags
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}/tags",
            post(tags::create_tag),
        )
        .route(
            "/api/v1/stages/{stage}/pictures/{origin}/{name}/tags/{tag_id}",
            put(tags::update_tag).delete(tags::delete_tag),
        )
        // Reconciliation
        .route(
            "/api/v1/audit/duplicates",
            get(audit::list_stage_duplicates),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
