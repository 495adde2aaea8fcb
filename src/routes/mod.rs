pub mod access;
pub mod auth;
pub mod dashboard;
pub mod files;
pub mod notices;
pub mod tickets;
pub mod users;
