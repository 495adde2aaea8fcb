use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::user_repository::UserRepository,
    models::user::{PublicUser, User, UserRole},
};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, company_name, role, is_approved, created_at";
const PUBLIC_COLUMNS: &str = "id, email, name, company_name, role, is_approved";

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_magic_user(
        &self,
        email: &str,
        name: &str,
        company_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, name, company_name, role, is_approved)
             VALUES (LOWER($1), $2, $3, $4, 'customer', true)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(company_name)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_customer(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, name, company_name, role, is_approved)
             VALUES (LOWER($1), $2, $3, $4, 'customer', false)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(company_name)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_team_member(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: UserRole,
    ) -> Result<PublicUser, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "INSERT INTO users (email, password_hash, name, role, is_approved)
             VALUES (LOWER($1), $2, $3, $4, true)
             RETURNING {PUBLIC_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_approved(
        &self,
        user_id: Uuid,
        approved: bool,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "UPDATE users SET is_approved = $1 WHERE id = $2 RETURNING {PUBLIC_COLUMNS}"
        ))
        .bind(approved)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "UPDATE users SET name = $1, company_name = $2 WHERE id = $3
             RETURNING {PUBLIC_COLUMNS}"
        ))
        .bind(name)
        .bind(company_name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_customers(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_COLUMNS} FROM users WHERE role = 'customer' ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn list_team(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_COLUMNS} FROM users WHERE role IN ('admin', 'itsm_team')
             ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn list_assignees(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_COLUMNS} FROM users WHERE role IN ('itsm_team', 'admin')
             ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn admin_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT email FROM users WHERE role = 'admin'")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    async fn staff_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT email FROM users WHERE role IN ('admin', 'itsm_team')")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    async fn insert_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO email_verifications (email, code, expires_at)
             VALUES (LOWER($1), $2, $3)",
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_verification_code(
        &self,
        email: &str,
        code: &str,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE email_verifications
             SET used_at = $3
             WHERE LOWER(email) = LOWER($1) AND code = $2
               AND expires_at > $3 AND used_at IS NULL",
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
