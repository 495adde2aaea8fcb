use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{
    reply::{ReplyFileOwner, ReplyView, ReplyWithAuthor, TicketReply},
    ticket::{
        FileRef, NewTicket, Ticket, TicketDetail, TicketFile, TicketFilter, TicketSummary,
        TicketStatus, UnreadCount,
    },
};

/// Ticket counts for the admin dashboard, one window at a time.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatusCounts {
    pub received: i64,
    pub in_progress: i64,
    pub answered: i64,
    pub closed: i64,
    pub total: i64,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket, sqlx::Error>;
    async fn attach_ticket_file(&self, ticket_id: Uuid, file: &FileRef)
        -> Result<(), sqlx::Error>;

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketSummary>, sqlx::Error>;
    async fn list_all(&self, filter: &TicketFilter) -> Result<Vec<TicketSummary>, sqlx::Error>;

    async fn find_detail(&self, ticket_id: Uuid) -> Result<Option<TicketDetail>, sqlx::Error>;
    async fn ticket_files(&self, ticket_id: Uuid) -> Result<Vec<TicketFile>, sqlx::Error>;

    /// Sets or clears the assignee. The assignee's own role is deliberately
    /// not validated here.
    async fn assign(
        &self,
        ticket_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Result<Option<Ticket>, sqlx::Error>;

    async fn set_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error>;

    async fn insert_reply(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        message: Option<&str>,
    ) -> Result<TicketReply, sqlx::Error>;
    async fn attach_reply_file(&self, reply_id: Uuid, file: &FileRef) -> Result<(), sqlx::Error>;
    async fn find_reply(
        &self,
        ticket_id: Uuid,
        reply_id: Uuid,
    ) -> Result<Option<TicketReply>, sqlx::Error>;
    async fn update_reply(&self, reply_id: Uuid, message: &str) -> Result<(), sqlx::Error>;
    async fn delete_reply(&self, reply_id: Uuid) -> Result<(), sqlx::Error>;
    async fn replies_with_files(&self, ticket_id: Uuid) -> Result<Vec<ReplyView>, sqlx::Error>;

    /// Conflict-resolving upsert on (ticket_id, user_id); must stay a single
    /// atomic statement so concurrent reads from two devices cannot race
    /// into duplicate watermark rows.
    async fn mark_read(&self, ticket_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>;

    /// Per owned ticket: admin-authored replies newer than the caller's
    /// watermark. One grouped aggregate query per caller.
    async fn customer_unread_counts(&self, user_id: Uuid)
        -> Result<Vec<UnreadCount>, sqlx::Error>;
    /// Per ticket (all tickets): customer-authored replies newer than the
    /// caller's own watermark.
    async fn staff_unread_counts(&self, user_id: Uuid) -> Result<Vec<UnreadCount>, sqlx::Error>;

    async fn find_ticket_file(&self, file_id: Uuid) -> Result<Option<TicketFile>, sqlx::Error>;
    async fn delete_ticket_file(&self, file_id: Uuid) -> Result<(), sqlx::Error>;
    async fn find_reply_file(&self, file_id: Uuid) -> Result<Option<ReplyFileOwner>, sqlx::Error>;
    async fn delete_reply_file(&self, file_id: Uuid) -> Result<(), sqlx::Error>;

    /// Candidates for the auto-close sweep.
    async fn answered_ticket_ids(&self) -> Result<Vec<Uuid>, sqlx::Error>;
    async fn latest_reply(&self, ticket_id: Uuid)
        -> Result<Option<ReplyWithAuthor>, sqlx::Error>;

    async fn status_counts(
        &self,
        since: OffsetDateTime,
        ticket_type: Option<&str>,
    ) -> Result<StatusCounts, sqlx::Error>;
}
