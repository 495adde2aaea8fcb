use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};
use uuid::Uuid;

/// Canonical ticket states. The wire and database values are the Korean
/// labels the service has always used; the allow-list is membership-only,
/// so staff may move a ticket between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_status")]
pub enum TicketStatus {
    #[sqlx(rename = "접수")]
    #[serde(rename = "접수")]
    Received,
    #[sqlx(rename = "진행중")]
    #[serde(rename = "진행중")]
    InProgress,
    #[sqlx(rename = "답변 완료")]
    #[serde(rename = "답변 완료")]
    Answered,
    #[sqlx(rename = "종결")]
    #[serde(rename = "종결")]
    Closed,
}

impl TicketStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::Received => "접수",
            TicketStatus::InProgress => "진행중",
            TicketStatus::Answered => "답변 완료",
            TicketStatus::Closed => "종결",
        }
    }

    /// Membership check against the canonical labels. Anything else is
    /// rejected before any mutation.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "접수" => Some(TicketStatus::Received),
            "진행중" => Some(TicketStatus::InProgress),
            "답변 완료" => Some(TicketStatus::Answered),
            "종결" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_urgency")]
pub enum Urgency {
    #[sqlx(rename = "높음")]
    #[serde(rename = "높음")]
    High,
    #[sqlx(rename = "보통")]
    #[serde(rename = "보통")]
    Normal,
    #[sqlx(rename = "낮음")]
    #[serde(rename = "낮음")]
    Low,
}

impl Urgency {
    pub fn label(&self) -> &'static str {
        match self {
            Urgency::High => "높음",
            Urgency::Normal => "보통",
            Urgency::Low => "낮음",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub urgency: Urgency,
    pub product: Option<String>,
    pub customer_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub platform: Option<String>,
    pub sw_version: Option<String>,
    pub os: Option<String>,
    pub ticket_type: String,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

/// List row: ticket plus the joined customer/assignee display columns.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct TicketSummary {
    pub id: Uuid,
    pub title: String,
    pub status: TicketStatus,
    pub urgency: Urgency,
    pub ticket_type: String,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub company_name: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

/// Detail row: the full ticket plus joined customer/assignee contacts,
/// which the close notification fan-out also feeds on.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct TicketDetail {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub urgency: Urgency,
    pub product: Option<String>,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub platform: Option<String>,
    pub sw_version: Option<String>,
    pub os: Option<String>,
    pub ticket_type: String,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: Option<String>,
    pub urgency: Urgency,
    pub product: Option<String>,
    pub customer_id: Uuid,
    pub platform: Option<String>,
    pub sw_version: Option<String>,
    pub os: Option<String>,
    pub ticket_type: String,
}

/// Descriptor of a blob already pushed to the blob store; the client uploads
/// first, then references the result here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub url: String,
    pub original_name: String,
    pub public_id: Option<String>,
    pub size: Option<i32>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct TicketFile {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub url: String,
    pub original_name: String,
    pub public_id: Option<String>,
    pub size: Option<i32>,
    pub created_at: time::OffsetDateTime,
}

/// Per-ticket unread tally for one caller's badge query.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UnreadCount {
    pub ticket_id: Uuid,
    pub unread_count: i64,
}

/// Optional list filters, compiled with `sqlx::QueryBuilder` — never by
/// string concatenation.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub urgency: Option<Urgency>,
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_accepts_only_canonical_labels() {
        assert_eq!(TicketStatus::from_label("접수"), Some(TicketStatus::Received));
        assert_eq!(TicketStatus::from_label("진행중"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::from_label("답변 완료"), Some(TicketStatus::Answered));
        assert_eq!(TicketStatus::from_label("종결"), Some(TicketStatus::Closed));

        assert_eq!(TicketStatus::from_label("완료"), None);
        assert_eq!(TicketStatus::from_label("closed"), None);
        assert_eq!(TicketStatus::from_label(""), None);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            TicketStatus::Received,
            TicketStatus::InProgress,
            TicketStatus::Answered,
            TicketStatus::Closed,
        ] {
            assert_eq!(TicketStatus::from_label(status.label()), Some(status));
        }
    }

    #[test]
    fn status_serializes_to_korean_label() {
        let json = serde_json::to_string(&TicketStatus::Answered).unwrap();
        assert_eq!(json, "\"답변 완료\"");
        let back: TicketStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TicketStatus::Answered);
    }
}
