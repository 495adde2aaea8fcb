use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role")] // Matches the Postgres enum name
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    ItsmTeam,
    Admin,
}

impl UserRole {
    /// Staff means anyone allowed past the team gate.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::ItsmTeam | UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Customer => "customer",
            UserRole::ItsmTeam => "itsm_team",
            UserRole::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub company_name: Option<String>,
    pub role: UserRole,
    pub is_approved: bool,
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Deserialize, Serialize, Clone, sqlx::FromRow)]
pub struct PublicUser {
    pub id: uuid::Uuid,
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
    pub role: UserRole,
    pub is_approved: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            company_name: user.company_name.clone(),
            role: user.role,
            is_approved: user.is_approved,
        }
    }
}
