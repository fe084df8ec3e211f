use picture_api::{
    application::lifecycle::use_case::PictureLifecycle,
    config::{BlobBackend, Config, PersistenceBackend},
    domain::picture::repository::{PictureRepository, StageStores},
    infrastructure::{
        codec::image_codec::ImageCodec,
        database::pool::connect_and_migrate,
        repositories::{
            memory_picture_repository::InMemoryPictureRepository,
            sqlx_picture_repository::SqlxPictureRepository,
        },
        storage::{
            memory_blob_store::InMemoryBlobStore, s3_blob_store::S3BlobStore, traits::BlobStore,
        },
    },
    presentation::http::{routes::create_router, state::AppState},
    workers::stage_audit::StageAuditWorker,
};
use axum::extract::DefaultBodyLimit;
use http::{HeaderValue, Method, header};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Uses RUST_LOG if set, otherwise sensible defaults
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new("info,picture_api=debug,tower_http=debug")
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;

    let (stores, db) = match config.persistence_backend {
        PersistenceBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres"))?;
            let pool = connect_and_migrate(
                url,
                config.database_max_connections,
                config.ignore_missing_migrations,
            )
            .await?;
            let stores = StageStores::from_fn(|stage| -> Arc<dyn PictureRepository> {
                Arc::new(SqlxPictureRepository::new(pool.clone(), stage))
            });
            (stores, Some(pool))
        }
        PersistenceBackend::Memory => {
            tracing::warn!("Using in-memory picture stores; records are lost on restart");
            let stores = StageStores::from_fn(|stage| -> Arc<dyn PictureRepository> {
                Arc::new(InMemoryPictureRepository::new(stage))
            });
            (stores, None)
        }
    };

    let blobs: Arc<dyn BlobStore> = match (config.blob_backend, config.s3.clone()) {
        (BlobBackend::S3, Some(s3)) => Arc::new(S3BlobStore::new(
            s3.access_key_id,
            s3.secret_access_key,
            s3.endpoint,
            s3.region,
            s3.force_path_style,
            s3.bucket_name,
        )),
        (BlobBackend::S3, None) => anyhow::bail!("S3 settings are required for the s3 backend"),
        (BlobBackend::Memory, _) => {
            tracing::warn!("Using in-memory blob store; rasters are lost on restart");
            Arc::new(InMemoryBlobStore::new())
        }
    };

    let lifecycle = Arc::new(PictureLifecycle::new(stores, blobs, Arc::new(ImageCodec)));

    if config.enable_stage_audit {
        let audit = StageAuditWorker::new(
            lifecycle.clone(),
            config.stage_audit_origins.clone(),
            config.stage_audit_interval_seconds,
        );
        tokio::spawn(async move { audit.start().await });
    }

    let allow_origin = if config.cors_allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let state = AppState {
        lifecycle,
        db,
        config: config.clone(),
    };

    let app = create_router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Picture API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
