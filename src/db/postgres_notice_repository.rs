use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::notice_repository::NoticeRepository, models::notice::Notice};

const NOTICE_COLUMNS: &str = "id, title, content, is_pinned, author_id, created_at, updated_at";

pub struct PostgresNoticeRepository {
    pub pool: PgPool,
}

#[async_trait]
impl NoticeRepository for PostgresNoticeRepository {
    async fn list(&self) -> Result<Vec<Notice>, sqlx::Error> {
        sqlx::query_as::<_, Notice>(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices
             ORDER BY is_pinned DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notice>, sqlx::Error> {
        sqlx::query_as::<_, Notice>(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert(
        &self,
        title: &str,
        content: &str,
        is_pinned: bool,
        author_id: Uuid,
    ) -> Result<Notice, sqlx::Error> {
        sqlx::query_as::<_, Notice>(&format!(
            "INSERT INTO notices (title, content, is_pinned, author_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {NOTICE_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(is_pinned)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        is_pinned: bool,
    ) -> Result<Option<Notice>, sqlx::Error> {
        sqlx::query_as::<_, Notice>(&format!(
            "UPDATE notices
             SET title = $1, content = $2, is_pinned = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING {NOTICE_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(is_pinned)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
