use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::user::{PublicUser, User, UserRole};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Email matching is case-insensitive throughout.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error>;

    /// Account minted by the access-request approval flow: customer role,
    /// pre-approved, with an unusable placeholder password hash.
    async fn create_magic_user(
        &self,
        email: &str,
        name: &str,
        company_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, sqlx::Error>;

    /// Self-registered customer; starts unapproved.
    async fn create_customer(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<User, sqlx::Error>;

    async fn create_team_member(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: UserRole,
    ) -> Result<PublicUser, sqlx::Error>;

    async fn set_approved(
        &self,
        user_id: Uuid,
        approved: bool,
    ) -> Result<Option<PublicUser>, sqlx::Error>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<Option<PublicUser>, sqlx::Error>;

    async fn list_customers(&self) -> Result<Vec<PublicUser>, sqlx::Error>;
    async fn list_team(&self) -> Result<Vec<PublicUser>, sqlx::Error>;
    async fn list_assignees(&self) -> Result<Vec<PublicUser>, sqlx::Error>;

    async fn admin_emails(&self) -> Result<Vec<String>, sqlx::Error>;
    /// Admin plus itsm_team, for the ticket-closed fan-out.
    async fn staff_emails(&self) -> Result<Vec<String>, sqlx::Error>;

    async fn insert_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;

    /// Returns true when an unexpired, unused code matched; the code is
    /// consumed either way it matched.
    async fn consume_verification_code(
        &self,
        email: &str,
        code: &str,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error>;
}
