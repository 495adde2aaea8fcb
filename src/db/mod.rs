pub mod access_request_repository;
pub mod mock_db;
pub mod notice_repository;
pub mod postgres_access_request_repository;
pub mod postgres_notice_repository;
pub mod postgres_ticket_repository;
pub mod postgres_user_repository;
pub mod ticket_repository;
pub mod user_repository;
