use async_trait::async_trait;
use std::any::Any;
use thiserror::Error;

use crate::models::{
    access_request::AccessRequest,
    ticket::{Ticket, TicketDetail},
    user::PublicUser,
};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Error: {0}")]
    Other(String),
    #[error("Invalid Address: {0}")]
    InvalidEmailAddress(String),
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Env Var Missing: {0}")]
    EnvVarMissing(String),
}

use lettre::transport::smtp::Error as SmtpError;

impl From<SmtpError> for MailError {
    fn from(err: SmtpError) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<std::env::VarError> for MailError {
    fn from(err: std::env::VarError) -> Self {
        MailError::EnvVarMissing(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

/// Outbound notifications, one method per kind. Injected into the handlers
/// at construction; every call site treats failure as log-and-continue, so
/// a send error never changes the outcome of the triggering action.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn verification_code(&self, to: &str, code: &str) -> Result<(), MailError>;
    async fn admin_approval_request(
        &self,
        recipients: &[String],
        user: &PublicUser,
    ) -> Result<(), MailError>;
    async fn user_approved(&self, to: &str, name: &str) -> Result<(), MailError>;
    async fn admin_new_ticket(
        &self,
        recipients: &[String],
        ticket: &Ticket,
        customer_name: &str,
    ) -> Result<(), MailError>;
    async fn ticket_status_changed(&self, to: &str, ticket: &Ticket) -> Result<(), MailError>;
    async fn ticket_closed(
        &self,
        recipients: &[String],
        ticket: &TicketDetail,
    ) -> Result<(), MailError>;
    async fn magic_link(&self, to: &str, login_url: &str) -> Result<(), MailError>;
    async fn admin_new_access_request(
        &self,
        recipients: &[String],
        request: &AccessRequest,
    ) -> Result<(), MailError>;
    async fn access_request_rejected(&self, to: &str, name: &str) -> Result<(), MailError>;
    #[allow(dead_code)]
    fn as_any(&self) -> &dyn Any;
}

mod mock_notifier;
mod smtp_impl;

use lettre::address::AddressError;
#[allow(unused_imports)]
pub use mock_notifier::MockNotifier;
pub use smtp_impl::SmtpNotifier;
