//! Application configuration loading from environment variables.
//!
//! All configuration is read once at startup. `.env` files are honoured via
//! `dotenvy` in `main` before [`Config::from_env`] runs.
//!
//! # Environment Variables
//!
//! ## Required Variables
//! - `DATABASE_URL`: PostgreSQL connection string (when `PERSISTENCE_BACKEND=postgres`)
//! - `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`, `S3_BUCKET_NAME` (when `BLOB_BACKEND=s3`)
//!
//! ## Optional Variables
//! - `RUST_LOG`: Logging level (default: "info,picture_api=debug,tower_http=debug")
//! - `HOST`: Server bind address (default: "0.0.0.0")
//! - `PORT`: Server port (default: 3000)
//! - `PERSISTENCE_BACKEND`: `postgres` or `memory` (default: postgres)
//! - `DATABASE_MAX_CONNECTIONS`: DB pool size (default: 20)
//! - `BLOB_BACKEND`: `s3` or `memory` (default: s3)
//! - `S3_ENDPOINT`: S3-compatible endpoint, unset for AWS itself
//! - `S3_REGION`: Bucket region (default: "auto")
//! - `S3_FORCE_PATH_STYLE`: Use path-style URLs (default: false)
//! - `MAX_UPLOAD_BYTES`: Request body limit for uploads (default: 20 MiB)
//! - `CORS_ALLOWED_ORIGINS`: Comma separated origins, unset allows any
//! - `ENABLE_STAGE_AUDIT`: Run the cross-stage duplicate scanner (default: false)
//! - `STAGE_AUDIT_ORIGINS`: Comma separated origins the scanner checks
//! - `STAGE_AUDIT_INTERVAL_SECONDS`: Scanner interval (default: 900)
//! - `IGNORE_MISSING_MIGRATIONS`: Skip missing migrations (default: true)

use serde::Deserialize;
use std::str::FromStr;

/// Where picture records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    Postgres,
    Memory,
}

impl FromStr for PersistenceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown persistence backend '{}'", other)),
        }
    }
}

/// Where raster bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    S3,
    Memory,
}

impl FromStr for BlobBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" | "r2" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown blob backend '{}'", other)),
        }
    }
}

/// Connection settings for the S3-compatible bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint (R2, MinIO); `None` targets AWS.
    pub endpoint: Option<String>,
    pub region: String,
    pub force_path_style: bool,
    pub bucket_name: String,
}

/// Complete server configuration loaded from environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,

    pub persistence_backend: PersistenceBackend,

    /// PostgreSQL connection string, present when the backend is postgres
    pub database_url: Option<String>,

    /// Maximum number of concurrent database connections
    pub database_max_connections: u32,

    pub blob_backend: BlobBackend,

    /// Bucket settings, present when the blob backend is s3
    pub s3: Option<S3Config>,

    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,

    /// Browser origins allowed by CORS; empty means any
    pub cors_allowed_origins: Vec<String>,

    pub enable_stage_audit: bool,

    /// Origins scanned for keys present in more than one stage
    pub stage_audit_origins: Vec<String>,

    pub stage_audit_interval_seconds: u64,

    /// Skip missing migrations during startup
    pub ignore_missing_migrations: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable required by the selected backends is
    /// missing, or if any set variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let persistence_backend = env.or("PERSISTENCE_BACKEND", PersistenceBackend::Postgres)?;
        let database_url = match persistence_backend {
            PersistenceBackend::Postgres => Some(env.required("DATABASE_URL")?),
            PersistenceBackend::Memory => env.optional("DATABASE_URL"),
        };

        let blob_backend = env.or("BLOB_BACKEND", BlobBackend::S3)?;
        let s3 = match blob_backend {
            BlobBackend::S3 => Some(S3Config {
                access_key_id: env.required("S3_ACCESS_KEY_ID")?,
                secret_access_key: env.required("S3_SECRET_ACCESS_KEY")?,
                endpoint: env.optional("S3_ENDPOINT"),
                region: env.or("S3_REGION", "auto".to_string())?,
                force_path_style: env.or("S3_FORCE_PATH_STYLE", false)?,
                bucket_name: env.required("S3_BUCKET_NAME")?,
            }),
            BlobBackend::Memory => None,
        };

        Ok(Self {
            host: env.or("HOST", "0.0.0.0".to_string())?,
            port: env.or("PORT", 3000)?,
            persistence_backend,
            database_url,
            database_max_connections: env.or("DATABASE_MAX_CONNECTIONS", 20)?,
            blob_backend,
            s3,
            max_upload_bytes: env.or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            cors_allowed_origins: env.list("CORS_ALLOWED_ORIGINS"),
            enable_stage_audit: env.or("ENABLE_STAGE_AUDIT", false)?,
            stage_audit_origins: env.list("STAGE_AUDIT_ORIGINS"),
            stage_audit_interval_seconds: env.or("STAGE_AUDIT_INTERVAL_SECONDS", 900)?,
            ignore_missing_migrations: env.or("IGNORE_MISSING_MIGRATIONS", true)?,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Load a required variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is not set.
    fn required(&self, key: &str) -> anyhow::Result<String> {
        self.optional(key)
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: {}", key))
    }

    /// Load a variable with a default value.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set but cannot be parsed.
    fn or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(val) => val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
            None => Ok(default),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.optional(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}
