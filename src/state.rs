use crate::config::Config;
use crate::db::{
    access_request_repository::AccessRequestRepository, notice_repository::NoticeRepository,
    ticket_repository::TicketRepository, user_repository::UserRepository,
};
use crate::services::{blob_store::BlobStore, notifier::Notifier};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub access_requests: Arc<dyn AccessRequestRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub notices: Arc<dyn NoticeRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: Arc<Config>,
}
