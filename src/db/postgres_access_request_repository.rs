use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::access_request_repository::AccessRequestRepository,
    models::access_request::{AccessRequest, AccessRequestStatus},
};

const REQUEST_COLUMNS: &str = "id, email, name, company_name, status, magic_token, \
     magic_token_expires_at, created_at, updated_at";

pub struct PostgresAccessRequestRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AccessRequestRepository for PostgresAccessRequestRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM access_requests WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert(
        &self,
        email: &str,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<AccessRequest, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "INSERT INTO access_requests (email, name, company_name, status)
             VALUES (LOWER($1), $2, $3, 'pending')
             ON CONFLICT (email) DO UPDATE
             SET name = EXCLUDED.name,
                 company_name = EXCLUDED.company_name,
                 status = 'pending',
                 magic_token = NULL,
                 magic_token_expires_at = NULL,
                 updated_at = NOW()
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(email)
        .bind(name)
        .bind(company_name)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_all(&self) -> Result<Vec<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM access_requests ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn list_by_status(
        &self,
        status: AccessRequestStatus,
    ) -> Result<Vec<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM access_requests WHERE status = $1
             ORDER BY created_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn approve(&self, id: Uuid) -> Result<Option<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "UPDATE access_requests SET status = 'approved', updated_at = NOW()
             WHERE id = $1 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reject(&self, id: Uuid) -> Result<Option<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "UPDATE access_requests SET status = 'rejected', updated_at = NOW()
             WHERE id = $1 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_magic_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "UPDATE access_requests
             SET magic_token = $1, magic_token_expires_at = $2, updated_at = NOW()
             WHERE LOWER(email) = LOWER($3) AND status = 'approved'
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(token)
        .bind(expires_at)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_valid_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<AccessRequest>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM access_requests
             WHERE magic_token = $1 AND magic_token_expires_at > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn invalidate_token(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE access_requests
             SET magic_token = NULL, magic_token_expires_at = NULL,
                 status = 'used', updated_at = NOW()
             WHERE magic_token = $1",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
