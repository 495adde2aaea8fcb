use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::UserRole;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct TicketReply {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub message: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

/// Reply row joined with its author, as served on the ticket detail view
/// and consumed by the auto-close sweep.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct ReplyWithAuthor {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_role: UserRole,
    pub message: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct ReplyFile {
    pub id: Uuid,
    pub reply_id: Uuid,
    pub url: String,
    pub original_name: String,
    pub public_id: Option<String>,
    pub size: Option<i32>,
    pub created_at: time::OffsetDateTime,
}

/// Reply file joined with the owning reply's author, for the
/// author-or-admin delete gate.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct ReplyFileOwner {
    pub id: Uuid,
    pub reply_id: Uuid,
    pub author_id: Uuid,
    pub public_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplyView {
    #[serde(flatten)]
    pub reply: ReplyWithAuthor,
    pub files: Vec<ReplyFile>,
}
