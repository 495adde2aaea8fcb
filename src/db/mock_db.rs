use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::access_request_repository::AccessRequestRepository;
use crate::db::notice_repository::NoticeRepository;
use crate::db::ticket_repository::{StatusCounts, TicketRepository};
use crate::db::user_repository::UserRepository;
use crate::models::access_request::{AccessRequest, AccessRequestStatus};
use crate::models::notice::Notice;
use crate::models::reply::{ReplyFile, ReplyFileOwner, ReplyView, ReplyWithAuthor, TicketReply};
use crate::models::ticket::{
    FileRef, NewTicket, Ticket, TicketDetail, TicketFile, TicketFilter, TicketSummary,
    TicketStatus, UnreadCount,
};
use crate::models::user::{PublicUser, User, UserRole};

fn mock_failure() -> sqlx::Error {
    sqlx::Error::Protocol("Mock DB failure".into())
}

#[allow(dead_code)]
pub fn user_fixture(email: &str, role: UserRole) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: String::new(),
        name: email.split('@').next().unwrap_or("user").to_string(),
        company_name: None,
        role,
        is_approved: true,
        created_at: OffsetDateTime::now_utc(),
    }
}

/// In-memory user store for route tests.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockUsers {
    pub users: Mutex<Vec<User>>,
    pub codes: Mutex<Vec<(String, String, OffsetDateTime, bool)>>,
    pub should_fail: bool,
}

#[allow(dead_code)]
impl MockUsers {
    pub fn with_users(users: Vec<User>) -> Self {
        MockUsers {
            users: Mutex::new(users),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        MockUsers {
            should_fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl UserRepository for MockUsers {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        Ok(self
            .find_user_by_id(user_id)
            .await?
            .as_ref()
            .map(PublicUser::from))
    }

    async fn create_magic_user(
        &self,
        email: &str,
        name: &str,
        company_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            company_name: company_name.map(str::to_string),
            role: UserRole::Customer,
            is_approved: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn create_customer(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            company_name: company_name.map(str::to_string),
            role: UserRole::Customer,
            is_approved: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn create_team_member(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: UserRole,
    ) -> Result<PublicUser, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            // Mirror the unique-violation the real store raises.
            return Err(sqlx::Error::Database(Box::new(MockUniqueViolation)));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            company_name: None,
            role,
            is_approved: true,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(PublicUser::from(&user))
    }

    async fn set_approved(
        &self,
        user_id: Uuid,
        approved: bool,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.is_approved = approved;
                Ok(Some(PublicUser::from(&*user)))
            }
            None => Ok(None),
        }
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.name = name.to_string();
                user.company_name = company_name.map(str::to_string);
                Ok(Some(PublicUser::from(&*user)))
            }
            None => Ok(None),
        }
    }

    async fn list_customers(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == UserRole::Customer)
            .map(PublicUser::from)
            .collect())
    }

    async fn list_team(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role.is_staff())
            .map(PublicUser::from)
            .collect())
    }

    async fn list_assignees(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        self.list_team().await
    }

    async fn admin_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == UserRole::Admin)
            .map(|u| u.email.clone())
            .collect())
    }

    async fn staff_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role.is_staff())
            .map(|u| u.email.clone())
            .collect())
    }

    async fn insert_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        self.codes.lock().unwrap().push((
            email.to_lowercase(),
            code.to_string(),
            expires_at,
            false,
        ));
        Ok(())
    }

    async fn consume_verification_code(
        &self,
        email: &str,
        code: &str,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut codes = self.codes.lock().unwrap();
        for entry in codes.iter_mut() {
            if entry.0.eq_ignore_ascii_case(email)
                && entry.1 == code
                && entry.2 > now
                && !entry.3
            {
                entry.3 = true;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Minimal DatabaseError standing in for a Postgres 23505.
#[derive(Debug)]
struct MockUniqueViolation;

impl std::fmt::Display for MockUniqueViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("duplicate key value violates unique constraint")
    }
}

impl std::error::Error for MockUniqueViolation {}

impl sqlx::error::DatabaseError for MockUniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some("23505".into())
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }
}

/// In-memory access-request ledger.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockAccessRequests {
    pub requests: Mutex<Vec<AccessRequest>>,
    pub should_fail: bool,
}

#[allow(dead_code)]
impl MockAccessRequests {
    pub fn with_requests(requests: Vec<AccessRequest>) -> Self {
        MockAccessRequests {
            requests: Mutex::new(requests),
            ..Default::default()
        }
    }

    pub fn request_fixture(email: &str, status: AccessRequestStatus) -> AccessRequest {
        let now = OffsetDateTime::now_utc();
        AccessRequest {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Requester".to_string(),
            company_name: None,
            status,
            magic_token: None,
            magic_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl AccessRequestRepository for MockAccessRequests {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccessRequest>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert(
        &self,
        email: &str,
        name: &str,
        company_name: Option<&str>,
    ) -> Result<AccessRequest, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let now = OffsetDateTime::now_utc();
        let mut requests = self.requests.lock().unwrap();
        if let Some(existing) = requests
            .iter_mut()
            .find(|r| r.email.eq_ignore_ascii_case(email))
        {
            existing.name = name.to_string();
            existing.company_name = company_name.map(str::to_string);
            existing.status = AccessRequestStatus::Pending;
            existing.magic_token = None;
            existing.magic_token_expires_at = None;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let request = AccessRequest {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            name: name.to_string(),
            company_name: company_name.map(str::to_string),
            status: AccessRequestStatus::Pending,
            magic_token: None,
            magic_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        requests.push(request.clone());
        Ok(request)
    }

    async fn list_all(&self) -> Result<Vec<AccessRequest>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn list_by_status(
        &self,
        status: AccessRequestStatus,
    ) -> Result<Vec<AccessRequest>, sqlx::Error> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn approve(&self, id: Uuid) -> Result<Option<AccessRequest>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut requests = self.requests.lock().unwrap();
        match requests.iter_mut().find(|r| r.id == id) {
            Some(request) => {
                request.status = AccessRequestStatus::Approved;
                request.updated_at = OffsetDateTime::now_utc();
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn reject(&self, id: Uuid) -> Result<Option<AccessRequest>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut requests = self.requests.lock().unwrap();
        match requests.iter_mut().find(|r| r.id == id) {
            Some(request) => {
                request.status = AccessRequestStatus::Rejected;
                request.updated_at = OffsetDateTime::now_utc();
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_magic_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<AccessRequest>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut requests = self.requests.lock().unwrap();
        match requests
            .iter_mut()
            .find(|r| r.email.eq_ignore_ascii_case(email) && r.status == AccessRequestStatus::Approved)
        {
            Some(request) => {
                request.magic_token = Some(token.to_string());
                request.magic_token_expires_at = Some(expires_at);
                request.updated_at = OffsetDateTime::now_utc();
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn find_by_valid_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<AccessRequest>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.magic_token.as_deref() == Some(token)
                    && r.magic_token_expires_at.map(|e| e > now).unwrap_or(false)
            })
            .cloned())
    }

    async fn invalidate_token(&self, token: &str) -> Result<(), sqlx::Error> {
        let mut requests = self.requests.lock().unwrap();
        if let Some(request) = requests
            .iter_mut()
            .find(|r| r.magic_token.as_deref() == Some(token))
        {
            request.magic_token = None;
            request.magic_token_expires_at = None;
            request.status = AccessRequestStatus::Used;
            request.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

/// In-memory ticket store. Watermarks and unread tallies follow the same
/// rules as the SQL aggregates so route tests exercise the real contracts.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryTickets {
    pub tickets: Mutex<Vec<Ticket>>,
    pub ticket_files: Mutex<Vec<TicketFile>>,
    pub replies: Mutex<Vec<TicketReply>>,
    pub reply_files: Mutex<Vec<ReplyFile>>,
    pub reads: Mutex<HashMap<(Uuid, Uuid), OffsetDateTime>>,
    /// author_id -> (name, email, role); stands in for the users join.
    pub directory: Mutex<HashMap<Uuid, (String, String, UserRole)>>,
    pub should_fail: bool,
}

#[allow(dead_code)]
impl MemoryTickets {
    pub fn register_user(&self, user: &User) {
        self.directory.lock().unwrap().insert(
            user.id,
            (user.name.clone(), user.email.clone(), user.role),
        );
    }

    pub fn watermark(&self, ticket_id: Uuid, user_id: Uuid) -> Option<OffsetDateTime> {
        self.reads.lock().unwrap().get(&(ticket_id, user_id)).copied()
    }

    pub fn watermark_rows(&self, ticket_id: Uuid, user_id: Uuid) -> usize {
        self.reads
            .lock()
            .unwrap()
            .keys()
            .filter(|(t, u)| *t == ticket_id && *u == user_id)
            .count()
    }

    fn lookup(&self, user_id: Uuid) -> Option<(String, String, UserRole)> {
        self.directory.lock().unwrap().get(&user_id).cloned()
    }

    fn summary(&self, ticket: &Ticket) -> TicketSummary {
        let customer = self.lookup(ticket.customer_id);
        let assignee = ticket.assignee_id.and_then(|id| self.lookup(id));
        TicketSummary {
            id: ticket.id,
            title: ticket.title.clone(),
            status: ticket.status,
            urgency: ticket.urgency,
            ticket_type: ticket.ticket_type.clone(),
            customer_id: ticket.customer_id,
            customer_name: customer.as_ref().map(|(name, _, _)| name.clone()),
            customer_email: customer.as_ref().map(|(_, email, _)| email.clone()),
            company_name: None,
            assignee_id: ticket.assignee_id,
            assignee_name: assignee.as_ref().map(|(name, _, _)| name.clone()),
            assignee_email: assignee.as_ref().map(|(_, email, _)| email.clone()),
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }

    fn matches(ticket: &Ticket, filter: &TicketFilter) -> bool {
        if let Some(status) = filter.status {
            if ticket.status != status {
                return false;
            }
        }
        if let Some(urgency) = filter.urgency {
            if ticket.urgency != urgency {
                return false;
            }
        }
        if let Some(keyword) = &filter.keyword {
            if !ticket
                .title
                .to_lowercase()
                .contains(&keyword.to_lowercase())
            {
                return false;
            }
        }
        true
    }

    fn unread_for(&self, user_id: Uuid, author_role: UserRole, scope: Option<Uuid>) -> Vec<UnreadCount> {
        let tickets = self.tickets.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let reads = self.reads.lock().unwrap();
        let directory = self.directory.lock().unwrap();

        tickets
            .iter()
            .filter(|t| scope.map(|owner| t.customer_id == owner).unwrap_or(true))
            .map(|ticket| {
                let watermark = reads.get(&(ticket.id, user_id)).copied();
                let unread_count = replies
                    .iter()
                    .filter(|r| r.ticket_id == ticket.id)
                    .filter(|r| {
                        directory
                            .get(&r.author_id)
                            .map(|(_, _, role)| *role == author_role)
                            .unwrap_or(false)
                    })
                    .filter(|r| watermark.map(|w| r.created_at > w).unwrap_or(true))
                    .count() as i64;
                UnreadCount {
                    ticket_id: ticket.id,
                    unread_count,
                }
            })
            .collect()
    }
}

#[async_trait]
impl TicketRepository for MemoryTickets {
    async fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let now = OffsetDateTime::now_utc();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            description: new.description.clone(),
            status: TicketStatus::Received,
            urgency: new.urgency,
            product: new.product.clone(),
            customer_id: new.customer_id,
            assignee_id: None,
            platform: new.platform.clone(),
            sw_version: new.sw_version.clone(),
            os: new.os.clone(),
            ticket_type: new.ticket_type.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tickets.lock().unwrap().push(ticket.clone());
        Ok(ticket)
    }

    async fn attach_ticket_file(
        &self,
        ticket_id: Uuid,
        file: &FileRef,
    ) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        self.ticket_files.lock().unwrap().push(TicketFile {
            id: Uuid::new_v4(),
            ticket_id,
            url: file.url.clone(),
            original_name: file.original_name.clone(),
            public_id: file.public_id.clone(),
            size: file.size,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketSummary>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.customer_id == customer_id && Self::matches(t, filter))
            .map(|t| self.summary(t))
            .collect())
    }

    async fn list_all(&self, filter: &TicketFilter) -> Result<Vec<TicketSummary>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| Self::matches(t, filter))
            .map(|t| self.summary(t))
            .collect())
    }

    async fn find_detail(&self, ticket_id: Uuid) -> Result<Option<TicketDetail>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let tickets = self.tickets.lock().unwrap();
        let Some(ticket) = tickets.iter().find(|t| t.id == ticket_id) else {
            return Ok(None);
        };
        let customer = self.lookup(ticket.customer_id);
        let assignee = ticket.assignee_id.and_then(|id| self.lookup(id));
        Ok(Some(TicketDetail {
            id: ticket.id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: ticket.status,
            urgency: ticket.urgency,
            product: ticket.product.clone(),
            customer_id: ticket.customer_id,
            customer_name: customer.as_ref().map(|(name, _, _)| name.clone()),
            customer_email: customer.as_ref().map(|(_, email, _)| email.clone()),
            assignee_id: ticket.assignee_id,
            assignee_name: assignee.as_ref().map(|(name, _, _)| name.clone()),
            assignee_email: assignee.as_ref().map(|(_, email, _)| email.clone()),
            platform: ticket.platform.clone(),
            sw_version: ticket.sw_version.clone(),
            os: ticket.os.clone(),
            ticket_type: ticket.ticket_type.clone(),
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }))
    }

    async fn ticket_files(&self, ticket_id: Uuid) -> Result<Vec<TicketFile>, sqlx::Error> {
        Ok(self
            .ticket_files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn assign(
        &self,
        ticket_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut tickets = self.tickets.lock().unwrap();
        match tickets.iter_mut().find(|t| t.id == ticket_id) {
            Some(ticket) => {
                ticket.assignee_id = assignee_id;
                ticket.updated_at = OffsetDateTime::now_utc();
                Ok(Some(ticket.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut tickets = self.tickets.lock().unwrap();
        match tickets.iter_mut().find(|t| t.id == ticket_id) {
            Some(ticket) => {
                ticket.status = status;
                ticket.updated_at = OffsetDateTime::now_utc();
                Ok(Some(ticket.clone()))
            }
            None => Ok(None),
        }
    }

    async fn insert_reply(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        message: Option<&str>,
    ) -> Result<TicketReply, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let now = OffsetDateTime::now_utc();
        let reply = TicketReply {
            id: Uuid::new_v4(),
            ticket_id,
            author_id,
            message: message.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.replies.lock().unwrap().push(reply.clone());
        Ok(reply)
    }

    async fn attach_reply_file(&self, reply_id: Uuid, file: &FileRef) -> Result<(), sqlx::Error> {
        self.reply_files.lock().unwrap().push(ReplyFile {
            id: Uuid::new_v4(),
            reply_id,
            url: file.url.clone(),
            original_name: file.original_name.clone(),
            public_id: file.public_id.clone(),
            size: file.size,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn find_reply(
        &self,
        ticket_id: Uuid,
        reply_id: Uuid,
    ) -> Result<Option<TicketReply>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .replies
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == reply_id && r.ticket_id == ticket_id)
            .cloned())
    }

    async fn update_reply(&self, reply_id: Uuid, message: &str) -> Result<(), sqlx::Error> {
        let mut replies = self.replies.lock().unwrap();
        if let Some(reply) = replies.iter_mut().find(|r| r.id == reply_id) {
            reply.message = Some(message.to_string());
            reply.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn delete_reply(&self, reply_id: Uuid) -> Result<(), sqlx::Error> {
        self.replies.lock().unwrap().retain(|r| r.id != reply_id);
        self.reply_files
            .lock()
            .unwrap()
            .retain(|f| f.reply_id != reply_id);
        Ok(())
    }

    async fn replies_with_files(&self, ticket_id: Uuid) -> Result<Vec<ReplyView>, sqlx::Error> {
        let replies = self.replies.lock().unwrap();
        let reply_files = self.reply_files.lock().unwrap();
        Ok(replies
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .map(|r| {
                let (author_name, _, author_role) = self
                    .lookup(r.author_id)
                    .unwrap_or_else(|| ("?".into(), String::new(), UserRole::Customer));
                ReplyView {
                    reply: ReplyWithAuthor {
                        id: r.id,
                        ticket_id: r.ticket_id,
                        author_id: r.author_id,
                        author_name,
                        author_role,
                        message: r.message.clone(),
                        created_at: r.created_at,
                        updated_at: r.updated_at,
                    },
                    files: reply_files
                        .iter()
                        .filter(|f| f.reply_id == r.id)
                        .cloned()
                        .collect(),
                }
            })
            .collect())
    }

    async fn mark_read(&self, ticket_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        self.reads
            .lock()
            .unwrap()
            .insert((ticket_id, user_id), OffsetDateTime::now_utc());
        Ok(())
    }

    async fn customer_unread_counts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UnreadCount>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.unread_for(user_id, UserRole::Admin, Some(user_id)))
    }

    async fn staff_unread_counts(&self, user_id: Uuid) -> Result<Vec<UnreadCount>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.unread_for(user_id, UserRole::Customer, None))
    }

    async fn find_ticket_file(&self, file_id: Uuid) -> Result<Option<TicketFile>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .ticket_files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == file_id)
            .cloned())
    }

    async fn delete_ticket_file(&self, file_id: Uuid) -> Result<(), sqlx::Error> {
        self.ticket_files.lock().unwrap().retain(|f| f.id != file_id);
        Ok(())
    }

    async fn find_reply_file(&self, file_id: Uuid) -> Result<Option<ReplyFileOwner>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let reply_files = self.reply_files.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        Ok(reply_files.iter().find(|f| f.id == file_id).and_then(|f| {
            replies
                .iter()
                .find(|r| r.id == f.reply_id)
                .map(|r| ReplyFileOwner {
                    id: f.id,
                    reply_id: f.reply_id,
                    author_id: r.author_id,
                    public_id: f.public_id.clone(),
                })
        }))
    }

    async fn delete_reply_file(&self, file_id: Uuid) -> Result<(), sqlx::Error> {
        self.reply_files.lock().unwrap().retain(|f| f.id != file_id);
        Ok(())
    }

    async fn answered_ticket_ids(&self) -> Result<Vec<Uuid>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.status == TicketStatus::Answered)
            .map(|t| t.id)
            .collect())
    }

    async fn latest_reply(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<ReplyWithAuthor>, sqlx::Error> {
        let replies = self.replies.lock().unwrap();
        Ok(replies
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .max_by_key(|r| r.created_at)
            .map(|r| {
                let (author_name, _, author_role) = self
                    .lookup(r.author_id)
                    .unwrap_or_else(|| ("?".into(), String::new(), UserRole::Customer));
                ReplyWithAuthor {
                    id: r.id,
                    ticket_id: r.ticket_id,
                    author_id: r.author_id,
                    author_name,
                    author_role,
                    message: r.message.clone(),
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                }
            }))
    }

    async fn status_counts(
        &self,
        since: OffsetDateTime,
        ticket_type: Option<&str>,
    ) -> Result<StatusCounts, sqlx::Error> {
        let tickets = self.tickets.lock().unwrap();
        let mut counts = StatusCounts::default();
        for ticket in tickets
            .iter()
            .filter(|t| t.created_at >= since)
            .filter(|t| ticket_type.map(|ty| t.ticket_type == ty).unwrap_or(true))
        {
            counts.total += 1;
            match ticket.status {
                TicketStatus::Received => counts.received += 1,
                TicketStatus::InProgress => counts.in_progress += 1,
                TicketStatus::Answered => counts.answered += 1,
                TicketStatus::Closed => counts.closed += 1,
            }
        }
        Ok(counts)
    }
}

/// In-memory notice board.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockNotices {
    pub notices: Mutex<Vec<Notice>>,
    pub should_fail: bool,
}

#[async_trait]
impl NoticeRepository for MockNotices {
    async fn list(&self) -> Result<Vec<Notice>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut notices = self.notices.lock().unwrap().clone();
        notices.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(notices)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notice>, sqlx::Error> {
        Ok(self
            .notices
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn insert(
        &self,
        title: &str,
        content: &str,
        is_pinned: bool,
        author_id: Uuid,
    ) -> Result<Notice, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let now = OffsetDateTime::now_utc();
        let notice = Notice {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            is_pinned,
            author_id: Some(author_id),
            created_at: now,
            updated_at: now,
        };
        self.notices.lock().unwrap().push(notice.clone());
        Ok(notice)
    }

    async fn update(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        is_pinned: bool,
    ) -> Result<Option<Notice>, sqlx::Error> {
        let mut notices = self.notices.lock().unwrap();
        match notices.iter_mut().find(|n| n.id == id) {
            Some(notice) => {
                notice.title = title.to_string();
                notice.content = content.to_string();
                notice.is_pinned = is_pinned;
                notice.updated_at = OffsetDateTime::now_utc();
                Ok(Some(notice.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut notices = self.notices.lock().unwrap();
        let before = notices.len();
        notices.retain(|n| n.id != id);
        Ok(notices.len() != before)
    }
}
