use async_trait::async_trait;
use uuid::Uuid;

use crate::models::notice::Notice;

#[async_trait]
pub trait NoticeRepository: Send + Sync {
    /// Pinned notices first, then newest first.
    async fn list(&self) -> Result<Vec<Notice>, sqlx::Error>;
    async fn find(&self, id: Uuid) -> Result<Option<Notice>, sqlx::Error>;
    async fn insert(
        &self,
        title: &str,
        content: &str,
        is_pinned: bool,
        author_id: Uuid,
    ) -> Result<Notice, sqlx::Error>;
    async fn update(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        is_pinned: bool,
    ) -> Result<Option<Notice>, sqlx::Error>;
    async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}
