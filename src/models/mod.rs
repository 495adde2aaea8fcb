pub mod access_request;
pub mod notice;
pub mod reply;
pub mod ticket;
pub mod user;
