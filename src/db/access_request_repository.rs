use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::access_request::{AccessRequest, AccessRequestStatus};

#[async_trait]
pub trait AccessRequestRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccessRequest>, sqlx::Error>;

    /// Inserts a new request in `pending`. An existing non-live row for the
    /// email (rejected, used, or implicitly expired) is reset to `pending`
    /// with a cleared token; the caller gates live rows beforehand.
    async fn insert(
        &self,
        email: &str,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<AccessRequest, sqlx::Error>;

    async fn list_all(&self) -> Result<Vec<AccessRequest>, sqlx::Error>;
    async fn list_by_status(
        &self,
        status: AccessRequestStatus,
    ) -> Result<Vec<AccessRequest>, sqlx::Error>;

    async fn approve(&self, id: Uuid) -> Result<Option<AccessRequest>, sqlx::Error>;
    async fn reject(&self, id: Uuid) -> Result<Option<AccessRequest>, sqlx::Error>;

    /// Writes the token onto the approved request for the email; a request
    /// in any other status is left untouched (returns None).
    async fn set_magic_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<AccessRequest>, sqlx::Error>;

    /// Token lookup requires `magic_token_expires_at > now`.
    async fn find_by_valid_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<AccessRequest>, sqlx::Error>;

    /// Single-use policy: clears the token and marks the request `used`.
    async fn invalidate_token(&self, token: &str) -> Result<(), sqlx::Error>;
}
