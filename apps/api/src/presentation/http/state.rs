use crate::{application::lifecycle::use_case::PictureLifecycle, config::Config};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<PictureLifecycle>,
    /// Present only with the postgres backend; probed by the health check.
    pub db: Option<PgPool>,
    pub config: Config,
}
