use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::Mailbox,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::models::{
    access_request::AccessRequest,
    ticket::{Ticket, TicketDetail},
    user::PublicUser,
};

use super::{MailError, Notifier};

#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
}

impl SmtpNotifier {
    pub fn new() -> Result<Self, anyhow::Error> {
        let host = std::env::var("SMTP_HOST")?;
        let username = std::env::var("SMTP_USERNAME")?;
        let password = std::env::var("SMTP_PASSWORD")?;
        let from = std::env::var("SMTP_FROM")?.parse()?;
        let port: u16 = std::env::var("SMTP_PORT")?.parse()?;

        let disabled_tls = std::env::var("SMTP_TLS_DISABLED")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let transport = if disabled_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
                .port(port)
                .build()
        } else {
            let creds = Credentials::new(username, password);
            let tls = TlsParameters::new(host.clone())?;

            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)?
                .port(port)
                .tls(Tls::Required(tls))
                .credentials(creds)
                .build()
        };

        Ok(Self {
            transport: Arc::new(transport),
            sender: from,
        })
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.sender.clone())
            .to(to
                .parse()
                .map_err(|e: AddressError| MailError::InvalidEmailAddress(e.to_string()))?)
            .subject(subject)
            .body(body.to_string())?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| e.into())
    }

    async fn send_to_many(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let mut builder = Message::builder().from(self.sender.clone());
        for recipient in recipients {
            let mailbox: Mailbox = recipient.parse()?;
            builder = builder.to(mailbox);
        }

        let email = builder.subject(subject).body(body.to_string())?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| e.into())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn verification_code(&self, to: &str, code: &str) -> Result<(), MailError> {
        let body = format!(
            "ITSM 회원가입을 위한 이메일 인증 코드입니다.\n\n인증 코드: {}\n\n이 코드는 10분간 유효합니다. 타인에게 공유하지 마세요.",
            code
        );
        self.send_email(to, "[BI ITSM] 이메일 인증 코드", &body).await
    }

    async fn admin_approval_request(
        &self,
        recipients: &[String],
        user: &PublicUser,
    ) -> Result<(), MailError> {
        let body = format!(
            "새로운 사용자가 ITSM에 가입했습니다. 승인 처리가 필요합니다.\n\n이름: {}\n이메일: {}\n회사: {}",
            user.name,
            user.email,
            user.company_name.as_deref().unwrap_or("미입력")
        );
        self.send_to_many(recipients, "[BI ITSM] 새로운 사용자 승인 요청", &body)
            .await
    }

    async fn user_approved(&self, to: &str, name: &str) -> Result<(), MailError> {
        let body = format!(
            "{}님, ITSM 계정이 승인되었습니다. 지금부터 로그인하실 수 있습니다.",
            name
        );
        self.send_email(to, "[BI ITSM] 계정 승인 완료", &body).await
    }

    async fn admin_new_ticket(
        &self,
        recipients: &[String],
        ticket: &Ticket,
        customer_name: &str,
    ) -> Result<(), MailError> {
        let body = format!(
            "새로운 티켓이 접수되었습니다.\n\n고객: {}\n제목: {}\n긴급도: {}\n유형: {}",
            customer_name, ticket.title, ticket.urgency, ticket.ticket_type
        );
        self.send_to_many(recipients, "[BI ITSM] 새로운 티켓 접수", &body)
            .await
    }

    async fn ticket_status_changed(&self, to: &str, ticket: &Ticket) -> Result<(), MailError> {
        let body = format!(
            "문의하신 티켓의 상태가 변경되었습니다.\n\n제목: {}\n현재 상태: {}",
            ticket.title, ticket.status
        );
        self.send_email(to, "[BI ITSM] 티켓 상태 변경 안내", &body).await
    }

    async fn ticket_closed(
        &self,
        recipients: &[String],
        ticket: &TicketDetail,
    ) -> Result<(), MailError> {
        let body = format!(
            "티켓이 종결되었습니다.\n\n제목: {}\n고객: {}\n담당자: {}",
            ticket.title,
            ticket.customer_name.as_deref().unwrap_or("-"),
            ticket.assignee_name.as_deref().unwrap_or("미배정")
        );
        self.send_to_many(recipients, "[BI ITSM] 티켓 종결 안내", &body)
            .await
    }

    async fn magic_link(&self, to: &str, login_url: &str) -> Result<(), MailError> {
        let body = format!(
            "아래 링크를 통해 ITSM에 로그인하실 수 있습니다.\n\n{}\n\n이 링크는 본인만 사용해야 합니다.",
            login_url
        );
        self.send_email(to, "[BI ITSM] 로그인 링크", &body).await
    }

    async fn admin_new_access_request(
        &self,
        recipients: &[String],
        request: &AccessRequest,
    ) -> Result<(), MailError> {
        let body = format!(
            "새로운 접근 요청이 접수되었습니다. 승인 처리가 필요합니다.\n\n이름: {}\n이메일: {}\n회사: {}",
            request.name,
            request.email,
            request.company_name.as_deref().unwrap_or("미입력")
        );
        self.send_to_many(recipients, "[BI ITSM] 새로운 접근 요청", &body)
            .await
    }

    async fn access_request_rejected(&self, to: &str, name: &str) -> Result<(), MailError> {
        let body = format!(
            "{}님, 죄송합니다. ITSM 접근 요청이 거절되었습니다.\n자세한 내용은 관리자에게 문의해주세요.",
            name
        );
        self.send_email(to, "[BI ITSM] 접근 요청 결과 안내", &body).await
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
