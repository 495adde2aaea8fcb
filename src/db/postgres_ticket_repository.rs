use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::ticket_repository::{StatusCounts, TicketRepository},
    models::{
        reply::{ReplyFile, ReplyFileOwner, ReplyView, ReplyWithAuthor, TicketReply},
        ticket::{
            FileRef, NewTicket, Ticket, TicketDetail, TicketFile, TicketFilter, TicketSummary,
            TicketStatus, UnreadCount,
        },
    },
};

const TICKET_COLUMNS: &str = "id, title, description, status, urgency, product, customer_id, \
     assignee_id, platform, sw_version, os, ticket_type, created_at, updated_at";

const SUMMARY_SELECT: &str = "SELECT t.id, t.title, t.status, t.urgency, t.ticket_type, \
     t.customer_id, c.name AS customer_name, c.email AS customer_email, \
     c.company_name, t.assignee_id, a.name AS assignee_name, a.email AS assignee_email, \
     t.created_at, t.updated_at \
     FROM tickets t \
     LEFT JOIN users c ON t.customer_id = c.id \
     LEFT JOIN users a ON t.assignee_id = a.id";

pub struct PostgresTicketRepository {
    pub pool: PgPool,
}

/// Appends the optional status/urgency/keyword predicates. Values are always
/// bound, never spliced into the SQL text.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND t.status = ");
        qb.push_bind(status);
    }
    if let Some(urgency) = filter.urgency {
        qb.push(" AND t.urgency = ");
        qb.push_bind(urgency);
    }
    if let Some(keyword) = &filter.keyword {
        qb.push(" AND t.title ILIKE ");
        qb.push_bind(format!("%{}%", keyword));
    }
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            "INSERT INTO tickets
                 (title, description, status, urgency, product, customer_id,
                  platform, sw_version, os, ticket_type)
             VALUES ($1, $2, '접수', $3, $4, $5, $6, $7, $8, $9)
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.urgency)
        .bind(&new.product)
        .bind(new.customer_id)
        .bind(&new.platform)
        .bind(&new.sw_version)
        .bind(&new.os)
        .bind(&new.ticket_type)
        .fetch_one(&self.pool)
        .await
    }

    async fn attach_ticket_file(
        &self,
        ticket_id: Uuid,
        file: &FileRef,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO ticket_files (ticket_id, url, original_name, public_id, size)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(ticket_id)
        .bind(&file.url)
        .bind(&file.original_name)
        .bind(&file.public_id)
        .bind(file.size)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(" WHERE t.customer_id = ");
        qb.push_bind(customer_id);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY t.created_at DESC");

        qb.build_query_as::<TicketSummary>()
            .fetch_all(&self.pool)
            .await
    }

    async fn list_all(&self, filter: &TicketFilter) -> Result<Vec<TicketSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(" WHERE 1=1");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY t.created_at DESC");

        qb.build_query_as::<TicketSummary>()
            .fetch_all(&self.pool)
            .await
    }

    async fn find_detail(&self, ticket_id: Uuid) -> Result<Option<TicketDetail>, sqlx::Error> {
        sqlx::query_as::<_, TicketDetail>(
            "SELECT t.id, t.title, t.description, t.status, t.urgency, t.product,
                    t.customer_id, c.name AS customer_name, c.email AS customer_email,
                    t.assignee_id, a.name AS assignee_name, a.email AS assignee_email,
                    t.platform, t.sw_version, t.os, t.ticket_type, t.created_at, t.updated_at
             FROM tickets t
             LEFT JOIN users c ON t.customer_id = c.id
             LEFT JOIN users a ON t.assignee_id = a.id
             WHERE t.id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn ticket_files(&self, ticket_id: Uuid) -> Result<Vec<TicketFile>, sqlx::Error> {
        sqlx::query_as::<_, TicketFile>(
            "SELECT id, ticket_id, url, original_name, public_id, size, created_at
             FROM ticket_files WHERE ticket_id = $1 ORDER BY created_at",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn assign(
        &self,
        ticket_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET assignee_id = $1, updated_at = NOW()
             WHERE id = $2 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(assignee_id)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET status = $1, updated_at = NOW()
             WHERE id = $2 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(status)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_reply(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        message: Option<&str>,
    ) -> Result<TicketReply, sqlx::Error> {
        sqlx::query_as::<_, TicketReply>(
            "INSERT INTO ticket_replies (ticket_id, author_id, message)
             VALUES ($1, $2, $3)
             RETURNING id, ticket_id, author_id, message, created_at, updated_at",
        )
        .bind(ticket_id)
        .bind(author_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
    }

    async fn attach_reply_file(&self, reply_id: Uuid, file: &FileRef) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO ticket_reply_files (reply_id, url, original_name, public_id, size)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(reply_id)
        .bind(&file.url)
        .bind(&file.original_name)
        .bind(&file.public_id)
        .bind(file.size)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_reply(
        &self,
        ticket_id: Uuid,
        reply_id: Uuid,
    ) -> Result<Option<TicketReply>, sqlx::Error> {
        sqlx::query_as::<_, TicketReply>(
            "SELECT id, ticket_id, author_id, message, created_at, updated_at
             FROM ticket_replies WHERE id = $1 AND ticket_id = $2",
        )
        .bind(reply_id)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_reply(&self, reply_id: Uuid, message: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE ticket_replies SET message = $1, updated_at = NOW() WHERE id = $2")
            .bind(message)
            .bind(reply_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_reply(&self, reply_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM ticket_replies WHERE id = $1")
            .bind(reply_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn replies_with_files(&self, ticket_id: Uuid) -> Result<Vec<ReplyView>, sqlx::Error> {
        let replies = sqlx::query_as::<_, ReplyWithAuthor>(
            "SELECT r.id, r.ticket_id, r.author_id, u.name AS author_name,
                    u.role AS author_role, r.message, r.created_at, r.updated_at
             FROM ticket_replies r
             JOIN users u ON r.author_id = u.id
             WHERE r.ticket_id = $1
             ORDER BY r.created_at ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        let files = sqlx::query_as::<_, ReplyFile>(
            "SELECT f.id, f.reply_id, f.url, f.original_name, f.public_id, f.size, f.created_at
             FROM ticket_reply_files f
             JOIN ticket_replies r ON f.reply_id = r.id
             WHERE r.ticket_id = $1
             ORDER BY f.created_at",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_reply: HashMap<Uuid, Vec<ReplyFile>> = HashMap::new();
        for file in files {
            by_reply.entry(file.reply_id).or_default().push(file);
        }

        Ok(replies
            .into_iter()
            .map(|reply| {
                let files = by_reply.remove(&reply.id).unwrap_or_default();
                ReplyView { reply, files }
            })
            .collect())
    }

    async fn mark_read(&self, ticket_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO ticket_reads (ticket_id, user_id, last_read_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (ticket_id, user_id)
             DO UPDATE SET last_read_at = NOW()",
        )
        .bind(ticket_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn customer_unread_counts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UnreadCount>, sqlx::Error> {
        sqlx::query_as::<_, UnreadCount>(
            "SELECT t.id AS ticket_id,
                    COUNT(r.*) FILTER (
                        WHERE u.role = 'admin'
                        AND (tr.last_read_at IS NULL OR r.created_at > tr.last_read_at)
                    ) AS unread_count
             FROM tickets t
             LEFT JOIN ticket_replies r ON t.id = r.ticket_id
             LEFT JOIN users u ON r.author_id = u.id
             LEFT JOIN ticket_reads tr ON t.id = tr.ticket_id AND tr.user_id = $1
             WHERE t.customer_id = $1
             GROUP BY t.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn staff_unread_counts(&self, user_id: Uuid) -> Result<Vec<UnreadCount>, sqlx::Error> {
        sqlx::query_as::<_, UnreadCount>(
            "SELECT t.id AS ticket_id,
                    COUNT(r.*) FILTER (
                        WHERE u.role = 'customer'
                        AND (tr.last_read_at IS NULL OR r.created_at > tr.last_read_at)
                    ) AS unread_count
             FROM tickets t
             LEFT JOIN ticket_replies r ON t.id = r.ticket_id
             LEFT JOIN users u ON r.author_id = u.id
             LEFT JOIN ticket_reads tr ON t.id = tr.ticket_id AND tr.user_id = $1
             GROUP BY t.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_ticket_file(&self, file_id: Uuid) -> Result<Option<TicketFile>, sqlx::Error> {
        sqlx::query_as::<_, TicketFile>(
            "SELECT id, ticket_id, url, original_name, public_id, size, created_at
             FROM ticket_files WHERE id = $1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_ticket_file(&self, file_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM ticket_files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_reply_file(&self, file_id: Uuid) -> Result<Option<ReplyFileOwner>, sqlx::Error> {
        sqlx::query_as::<_, ReplyFileOwner>(
            "SELECT f.id, f.reply_id, r.author_id, f.public_id
             FROM ticket_reply_files f
             JOIN ticket_replies r ON f.reply_id = r.id
             WHERE f.id = $1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_reply_file(&self, file_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM ticket_reply_files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn answered_ticket_ids(&self) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM tickets WHERE status = '답변 완료'")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn latest_reply(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<ReplyWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, ReplyWithAuthor>(
            "SELECT r.id, r.ticket_id, r.author_id, u.name AS author_name,
                    u.role AS author_role, r.message, r.created_at, r.updated_at
             FROM ticket_replies r
             JOIN users u ON r.author_id = u.id
             WHERE r.ticket_id = $1
             ORDER BY r.created_at DESC
             LIMIT 1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn status_counts(
        &self,
        since: OffsetDateTime,
        ticket_type: Option<&str>,
    ) -> Result<StatusCounts, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FILTER (WHERE status = '접수') AS received,
                    COUNT(*) FILTER (WHERE status = '진행중') AS in_progress,
                    COUNT(*) FILTER (WHERE status = '답변 완료') AS answered,
                    COUNT(*) FILTER (WHERE status = '종결') AS closed,
                    COUNT(*) AS total
             FROM tickets WHERE created_at >= ",
        );
        qb.push_bind(since);
        if let Some(ticket_type) = ticket_type {
            qb.push(" AND ticket_type = ");
            qb.push_bind(ticket_type.to_string());
        }

        let (received, in_progress, answered, closed, total): (i64, i64, i64, i64, i64) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        Ok(StatusCounts {
            received,
            in_progress,
            answered,
            closed,
            total,
        })
    }
}
