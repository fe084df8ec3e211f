use crate::domain::picture::{
    entity::{Picture, PictureFilter, PictureKey, Size, Tag},
    errors::DomainError,
    repository::PictureRepository,
    stage::Stage,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

#[derive(FromRow)]
struct PictureRow {
    origin: String,
    name: String,
    origin_id: String,
    extension: String,
    creation_date: DateTime<Utc>,
    sizes: Json<BTreeMap<Uuid, Size>>,
    tags: Json<BTreeMap<Uuid, Tag>>,
}

impl From<PictureRow> for Picture {
    fn from(r: PictureRow) -> Self {
        Picture {
            origin: r.origin,
            name: r.name,
            origin_id: r.origin_id,
            extension: r.extension,
            creation_date: r.creation_date,
            sizes: r.sizes.0,
            tags: r.tags.0,
        }
    }
}

const COLUMNS: &str = "origin, name, origin_id, extension, creation_date, sizes, tags";

/// PostgreSQL picture store for one stage.
///
/// Each stage owns its own table, so the stores stay physically separate
/// the same way independent document tables would be.
pub struct SqlxPictureRepository {
    pub pool: PgPool,
    stage: Stage,
}

impl SqlxPictureRepository {
    /// Creates a store bound to the table backing `stage`.
    ///
    /// # Arguments
    /// * `pool` - PostgreSQL connection pool for database operations
    /// * `stage` - Review stage whose table this instance reads and writes
    pub fn new(pool: PgPool, stage: Stage) -> Self {
        info!("Initializing SqlxPictureRepository for {} stage", stage);
        Self { pool, stage }
    }

    pub fn table_for(stage: Stage) -> &'static str {
        match stage {
            Stage::Pending => "pictures_pending",
            Stage::Validated => "pictures_validated",
            Stage::Published => "pictures_published",
            Stage::Blocked => "pictures_blocked",
        }
    }

    fn table(&self) -> &'static str {
        Self::table_for(self.stage)
    }

    fn infra(&self, op: &str, e: sqlx::Error) -> DomainError {
        error!("{} on {} failed: {}", op, self.table(), e);
        DomainError::InfrastructureError(format!("{} failed: {}", op, e))
    }

    fn not_found(&self, key: &PictureKey) -> DomainError {
        DomainError::NotFound {
            stage: self.stage,
            key: key.clone(),
        }
    }

    /// Tells a missing picture apart from a missing tag after a tag write
    /// touched no rows.
    async fn missing_tag_error(&self, key: &PictureKey, tag_id: Uuid) -> DomainError {
        match self.find(key).await {
            Ok(Some(_)) => DomainError::TagNotFound {
                key: key.clone(),
                tag_id,
            },
            Ok(None) => self.not_found(key),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl PictureRepository for SqlxPictureRepository {
    #[instrument(skip(self, picture), fields(stage = %self.stage, key = %picture.key()))]
    async fn create(&self, picture: &Picture) -> Result<(), DomainError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.table(),
            COLUMNS
        );
        sqlx::query(&sql)
            .bind(&picture.origin)
            .bind(&picture.name)
            .bind(&picture.origin_id)
            .bind(&picture.extension)
            .bind(picture.creation_date)
            .bind(Json(&picture.sizes))
            .bind(Json(&picture.tags))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let duplicate = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if duplicate {
                    DomainError::AlreadyExists {
                        stage: self.stage,
                        key: picture.key(),
                    }
                } else {
                    self.infra("insert", e)
                }
            })?;
        debug!("Picture row inserted");
        Ok(())
    }

    #[instrument(skip(self), fields(stage = %self.stage))]
    async fn find(&self, key: &PictureKey) -> Result<Option<Picture>, DomainError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE origin = $1 AND name = $2",
            COLUMNS,
            self.table()
        );
        let row = sqlx::query_as::<_, PictureRow>(&sql)
            .bind(&key.origin)
            .bind(&key.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.infra("select", e))?;
        Ok(row.map(Picture::from))
    }

    #[instrument(skip(self, picture), fields(stage = %self.stage, key = %picture.key()))]
    async fn update(&self, picture: &Picture) -> Result<(), DomainError> {
        let sql = format!(
            "UPDATE {} SET origin_id = $3, extension = $4, creation_date = $5, sizes = $6, tags = $7
             WHERE origin = $1 AND name = $2",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(&picture.origin)
            .bind(&picture.name)
            .bind(&picture.origin_id)
            .bind(&picture.extension)
            .bind(picture.creation_date)
            .bind(Json(&picture.sizes))
            .bind(Json(&picture.tags))
            .execute(&self.pool)
            .await
            .map_err(|e| self.infra("update", e))?;
        if result.rows_affected() == 0 {
            return Err(self.not_found(&picture.key()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(stage = %self.stage))]
    async fn delete(&self, key: &PictureKey) -> Result<(), DomainError> {
        let sql = format!(
            "DELETE FROM {} WHERE origin = $1 AND name = $2",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(&key.origin)
            .bind(&key.name)
            .execute(&self.pool)
            .await
            .map_err(|e| self.infra("delete", e))?;
        if result.rows_affected() == 0 {
            return Err(self.not_found(key));
        }
        Ok(())
    }

    #[instrument(skip(self, filter), fields(stage = %self.stage))]
    async fn list(
        &self,
        origin: &str,
        filter: &PictureFilter,
    ) -> Result<Vec<Picture>, DomainError> {
        let page = filter.pagination.clamped();
        let sql = format!(
            "SELECT {} FROM {}
             WHERE origin = $1 AND ($2::text IS NULL OR origin_id = $2)
             ORDER BY creation_date DESC, name ASC
             LIMIT $3 OFFSET $4",
            COLUMNS,
            self.table()
        );
        let rows = sqlx::query_as::<_, PictureRow>(&sql)
            .bind(origin)
            .bind(filter.origin_id.as_deref())
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.infra("list", e))?;
        debug!("Listed {} pictures", rows.len());
        Ok(rows.into_iter().map(Picture::from).collect())
    }

    #[instrument(skip(self, tag), fields(stage = %self.stage))]
    async fn create_tag(
        &self,
        key: &PictureKey,
        tag_id: Uuid,
        tag: &Tag,
    ) -> Result<(), DomainError> {
        let sql = format!(
            "UPDATE {} SET tags = tags || jsonb_build_object($3::text, $4::jsonb)
             WHERE origin = $1 AND name = $2",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(&key.origin)
            .bind(&key.name)
            .bind(tag_id.to_string())
            .bind(Json(tag))
            .execute(&self.pool)
            .await
            .map_err(|e| self.infra("create tag", e))?;
        if result.rows_affected() == 0 {
            return Err(self.not_found(key));
        }
        Ok(())
    }

    #[instrument(skip(self, tag), fields(stage = %self.stage))]
    async fn update_tag(
        &self,
        key: &PictureKey,
        tag_id: Uuid,
        tag: &Tag,
    ) -> Result<(), DomainError> {
        let sql = format!(
            "UPDATE {} SET tags = jsonb_set(tags, ARRAY[$3::text], $4::jsonb, false)
             WHERE origin = $1 AND name = $2 AND tags ? $3",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(&key.origin)
            .bind(&key.name)
            .bind(tag_id.to_string())
            .bind(Json(tag))
            .execute(&self.pool)
            .await
            .map_err(|e| self.infra("update tag", e))?;
        if result.rows_affected() == 0 {
            return Err(self.missing_tag_error(key, tag_id).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(stage = %self.stage))]
    async fn delete_tag(&self, key: &PictureKey, tag_id: Uuid) -> Result<(), DomainError> {
        let sql = format!(
            "UPDATE {} SET tags = tags - $3::text
             WHERE origin = $1 AND name = $2 AND tags ? $3",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(&key.origin)
            .bind(&key.name)
            .bind(tag_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| self.infra("delete tag", e))?;
        if result.rows_affected() == 0 {
            return Err(self.missing_tag_error(key, tag_id).await);
        }
        Ok(())
    }
}
