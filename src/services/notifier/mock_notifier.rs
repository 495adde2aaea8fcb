use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{
    access_request::AccessRequest,
    ticket::{Ticket, TicketDetail},
    user::PublicUser,
};

use super::{MailError, Notifier};

/// Records every notification attempt so tests can assert that a send was
/// attempted (never that it was delivered).
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct MockNotifier {
    pub verification_codes: Mutex<Vec<(String, String)>>,
    pub approval_requests: Mutex<Vec<(Vec<String>, String)>>,
    pub approved_users: Mutex<Vec<(String, String)>>,
    pub new_tickets: Mutex<Vec<(Vec<String>, uuid::Uuid)>>,
    pub status_changes: Mutex<Vec<(String, uuid::Uuid, String)>>,
    pub closed_tickets: Mutex<Vec<(Vec<String>, uuid::Uuid)>>,
    pub magic_links: Mutex<Vec<(String, String)>>,
    pub new_access_requests: Mutex<Vec<(Vec<String>, String)>>,
    pub rejections: Mutex<Vec<(String, String)>>,
    pub fail_send: bool,
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn verification_code(&self, to: &str, code: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.verification_codes
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }

    async fn admin_approval_request(
        &self,
        recipients: &[String],
        user: &PublicUser,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.approval_requests
            .lock()
            .unwrap()
            .push((recipients.to_vec(), user.email.clone()));
        Ok(())
    }

    async fn user_approved(&self, to: &str, name: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.approved_users
            .lock()
            .unwrap()
            .push((to.to_string(), name.to_string()));
        Ok(())
    }

    async fn admin_new_ticket(
        &self,
        recipients: &[String],
        ticket: &Ticket,
        _customer_name: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.new_tickets
            .lock()
            .unwrap()
            .push((recipients.to_vec(), ticket.id));
        Ok(())
    }

    async fn ticket_status_changed(&self, to: &str, ticket: &Ticket) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.status_changes.lock().unwrap().push((
            to.to_string(),
            ticket.id,
            ticket.status.label().to_string(),
        ));
        Ok(())
    }

    async fn ticket_closed(
        &self,
        recipients: &[String],
        ticket: &TicketDetail,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.closed_tickets
            .lock()
            .unwrap()
            .push((recipients.to_vec(), ticket.id));
        Ok(())
    }

    async fn magic_link(&self, to: &str, login_url: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.magic_links
            .lock()
            .unwrap()
            .push((to.to_string(), login_url.to_string()));
        Ok(())
    }

    async fn admin_new_access_request(
        &self,
        recipients: &[String],
        request: &AccessRequest,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.new_access_requests
            .lock()
            .unwrap()
            .push((recipients.to_vec(), request.email.clone()));
        Ok(())
    }

    async fn access_request_rejected(&self, to: &str, name: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.rejections
            .lock()
            .unwrap()
            .push((to.to_string(), name.to_string()));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
