use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "access_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
    Used,
}

impl AccessRequestStatus {
    /// A request is live while it still blocks a new request for the same email.
    pub fn is_live(&self) -> bool {
        matches!(self, AccessRequestStatus::Pending | AccessRequestStatus::Approved)
    }
}

impl fmt::Display for AccessRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessRequestStatus::Pending => "pending",
            AccessRequestStatus::Approved => "approved",
            AccessRequestStatus::Rejected => "rejected",
            AccessRequestStatus::Used => "used",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AccessRequestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccessRequestStatus::Pending),
            "approved" => Ok(AccessRequestStatus::Approved),
            "rejected" => Ok(AccessRequestStatus::Rejected),
            "used" => Ok(AccessRequestStatus::Used),
            _ => Err(()),
        }
    }
}

/// A request for passwordless access. Linked to a `User` by email only; the
/// request may exist before the user does, and survives after.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct AccessRequest {
    pub id: uuid::Uuid,
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
    pub status: AccessRequestStatus,
    #[serde(skip_serializing)]
    pub magic_token: Option<String>,
    pub magic_token_expires_at: Option<time::OffsetDateTime>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}
