//! Postgres-backed `CvStore`.
//!
//! Assumes the tables below already exist; schema management lives outside this
//! service. Structured parts of a CV are kept as JSONB so new display settings or
//! content fields need no migration.
//!
//! ```text
//! cv_documents  (id uuid pk, user_id uuid, title text, content jsonb,
//!                display_settings jsonb, archived_at timestamptz null,
//!                created_at timestamptz, updated_at timestamptz)
//! profile_items (id uuid pk, user_id uuid, kind text, display_order int, data jsonb)
//! cv_selections (cv_id uuid, item_id uuid, display_order int null, data jsonb,
//!                primary key (cv_id, item_id))
//! ```

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::cv::{CvContent, CvDocument, DisplaySettings, FieldEdit};
use crate::models::profile::ProfileItem;
use crate::models::selection::Selection;
use crate::store::{cv_not_found, CvStore, StoreError};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

// ────────────────────────────────────────────────────────────────────────────
// Rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct CvRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: Json<CvContent>,
    display_settings: Json<DisplaySettings>,
    archived_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CvRow> for CvDocument {
    fn from(row: CvRow) -> Self {
        CvDocument {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            content: row.content.0,
            display_settings: row.display_settings.0,
            archived_at: row.archived_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    data: Json<ProfileItem>,
}

#[derive(Debug, FromRow)]
struct SelectionRow {
    data: Json<Selection>,
}

const CV_COLUMNS: &str =
    "id, user_id, title, content, display_settings, archived_at, created_at, updated_at";

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_cv(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<CvDocument, StoreError> {
        let row = sqlx::query_as::<_, CvRow>(&format!(
            "SELECT {CV_COLUMNS} FROM cv_documents WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| cv_not_found(id))?;
        Ok(row.into())
    }

    async fn write_cv(
        tx: &mut Transaction<'_, Postgres>,
        doc: &CvDocument,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE cv_documents
             SET title = $2, content = $3, display_settings = $4,
                 archived_at = $5, updated_at = $6
             WHERE id = $1",
        )
        .bind(doc.id)
        .bind(&doc.title)
        .bind(Json(&doc.content))
        .bind(Json(&doc.display_settings))
        .bind(doc.archived_at)
        .bind(doc.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CvStore for PgStore {
    async fn create_cv(&self, doc: CvDocument) -> Result<CvDocument, StoreError> {
        let result = sqlx::query(
            "INSERT INTO cv_documents
                 (id, user_id, title, content, display_settings, archived_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(doc.id)
        .bind(doc.user_id)
        .bind(&doc.title)
        .bind(Json(&doc.content))
        .bind(Json(&doc.display_settings))
        .bind(doc.archived_at)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("CV {} already exists", doc.id)));
        }
        debug!(cv_id = %doc.id, "CV created");
        Ok(doc)
    }

    async fn get_cv(&self, id: Uuid) -> Result<CvDocument, StoreError> {
        let row = sqlx::query_as::<_, CvRow>(&format!(
            "SELECT {CV_COLUMNS} FROM cv_documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| cv_not_found(id))?;
        Ok(row.into())
    }

    async fn list_cvs(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<CvDocument>, StoreError> {
        let rows = sqlx::query_as::<_, CvRow>(&format!(
            "SELECT {CV_COLUMNS} FROM cv_documents
             WHERE user_id = $1 AND ($2 OR archived_at IS NULL)
             ORDER BY updated_at DESC, id"
        ))
        .bind(user_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CvDocument::from).collect())
    }

    async fn apply_edit(&self, id: Uuid, edit: FieldEdit) -> Result<CvDocument, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut doc = Self::lock_cv(&mut tx, id).await?;
        edit.apply(&mut doc);
        Self::write_cv(&mut tx, &doc).await?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<CvDocument, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut doc = Self::lock_cv(&mut tx, id).await?;
        let now = Utc::now();
        doc.archived_at = archived.then_some(now);
        doc.updated_at = now;
        Self::write_cv(&mut tx, &doc).await?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn delete_cv(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cv_selections WHERE cv_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM cv_documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(cv_not_found(id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_profile(&self, user_id: Uuid) -> Result<Vec<ProfileItem>, StoreError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT data FROM profile_items WHERE user_id = $1 ORDER BY kind, display_order, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.data.0).collect())
    }

    async fn upsert_profile_item(&self, item: ProfileItem) -> Result<ProfileItem, StoreError> {
        let result = sqlx::query(
            "INSERT INTO profile_items (id, user_id, kind, display_order, data)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
                 SET kind = EXCLUDED.kind,
                     display_order = EXCLUDED.display_order,
                     data = EXCLUDED.data
                 WHERE profile_items.user_id = EXCLUDED.user_id",
        )
        .bind(item.id())
        .bind(item.user_id())
        .bind(item.kind().as_str())
        .bind(item.display_order())
        .bind(Json(&item))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "profile item {} belongs to another user",
                item.id()
            )));
        }
        Ok(item)
    }

    async fn delete_profile_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM profile_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile item {item_id}")));
        }
        sqlx::query("DELETE FROM cv_selections WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_selections(&self, cv_id: Uuid) -> Result<Vec<Selection>, StoreError> {
        // Distinguish "no selections" from "no such CV".
        self.get_cv(cv_id).await?;
        let rows = sqlx::query_as::<_, SelectionRow>(
            "SELECT data FROM cv_selections WHERE cv_id = $1 ORDER BY display_order NULLS LAST, item_id",
        )
        .bind(cv_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.data.0).collect())
    }

    async fn upsert_selections(
        &self,
        cv_id: Uuid,
        selections: Vec<Selection>,
    ) -> Result<Vec<Selection>, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_cv(&mut tx, cv_id).await?;

        for mut selection in selections {
            selection.cv_id = cv_id;
            sqlx::query(
                "INSERT INTO cv_selections (cv_id, item_id, display_order, data)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (cv_id, item_id) DO UPDATE
                     SET display_order = EXCLUDED.display_order, data = EXCLUDED.data",
            )
            .bind(cv_id)
            .bind(selection.item_id)
            .bind(selection.display_order)
            .bind(Json(&selection))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.list_selections(cv_id).await
    }
}
