/// Canonical image store
use crate::{
    db::parse_date,
    error::{BookmarksError, BookmarksResult},
    images::{CreateImageRequest, Image},
    validation::{slugify, validate_image_url, validate_title, MAX_TITLE_LENGTH},
};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashMap;

const IMAGE_COLUMNS: &str =
    "SELECT id, user_id, title, slug, url, description, created, total_likes FROM image";

/// Image persistence and lookups
#[derive(Clone)]
pub struct ImageStore {
    db: SqlitePool,
}

impl ImageStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Validate and store a new bookmark owned by `user_id`
    pub async fn create(&self, user_id: i64, req: &CreateImageRequest) -> BookmarksResult<Image> {
        validate_title(&req.title)?;
        validate_image_url(&req.url)?;

        let title = req.title.trim();
        let slug = match req.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slugify(slug),
            _ => slugify(title),
        };
        let slug: String = slug.chars().take(MAX_TITLE_LENGTH).collect();
        if slug.is_empty() {
            return Err(BookmarksError::Validation(
                "Title must contain at least one letter or digit".to_string(),
            ));
        }
        let created = Utc::now().date_naive();

        let id = sqlx::query(
            r#"
            INSERT INTO image (user_id, title, slug, url, description, created, total_likes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(&slug)
        .bind(&req.url)
        .bind(&req.description)
        .bind(created.format("%Y-%m-%d").to_string())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        tracing::info!(image_id = id, user_id, "Bookmarked image");

        Ok(Image {
            id,
            user_id: Some(user_id),
            title: title.to_string(),
            slug,
            url: req.url.clone(),
            description: req.description.clone(),
            created,
            total_likes: 0,
        })
    }

    pub async fn get(&self, id: i64) -> BookmarksResult<Option<Image>> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", IMAGE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(image_from_row).transpose()
    }

    /// Look up by id and slug together, as the detail URL does
    pub async fn get_by_id_and_slug(&self, id: i64, slug: &str) -> BookmarksResult<Image> {
        let row = sqlx::query(&format!("{} WHERE id = ?1 AND slug = ?2", IMAGE_COLUMNS))
            .bind(id)
            .bind(slug)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => image_from_row(&row),
            None => Err(BookmarksError::NotFound(format!("Image {} not found", id))),
        }
    }

    /// Images newest first
    pub async fn list(&self, limit: i64) -> BookmarksResult<Vec<Image>> {
        let rows = sqlx::query(&format!("{} ORDER BY created DESC, id DESC LIMIT ?1", IMAGE_COLUMNS))
            .bind(limit)
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(image_from_row).collect()
    }

    /// Batch lookup keyed by id. Order is unspecified; missing ids are absent.
    pub async fn get_many(&self, ids: &[i64]) -> BookmarksResult<HashMap<i64, Image>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = sqlx::QueryBuilder::<sqlx::Sqlite>::new(IMAGE_COLUMNS);
        query.push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query.build().fetch_all(&self.db).await?;
        let mut images = HashMap::with_capacity(rows.len());
        for row in &rows {
            let image = image_from_row(row)?;
            images.insert(image.id, image);
        }
        Ok(images)
    }

    /// Every image id, for maintenance sweeps
    pub async fn all_ids(&self) -> BookmarksResult<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT id FROM image ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(ids)
    }
}

fn image_from_row(row: &SqliteRow) -> BookmarksResult<Image> {
    Ok(Image {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        created: parse_date(&row.try_get::<String, _>("created")?)?,
        total_likes: row.try_get("total_likes")?,
    })
}
