use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::{User, UserRole};
use crate::utils::jwt::TOKEN_TTL_HOURS;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // user UUID
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub exp: usize, // expiration (as UNIX timestamp)
}

impl Claims {
    /// Snapshot of the user at issuance. Role or approval changes after this
    /// point are not reflected until the next token is issued.
    pub fn for_user(user: &User) -> Self {
        Claims {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
        }
    }
}
