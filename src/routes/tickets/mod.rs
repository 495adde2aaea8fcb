pub mod crud;
pub mod reads;
pub mod replies;
pub mod status;

pub use crud::{assign_ticket, create_ticket, list_all_tickets, list_my_tickets, ticket_detail};
pub use reads::{admin_unread_counts, mark_ticket_read, my_unread_counts};
pub use replies::{add_reply, delete_reply, edit_reply};
pub use status::set_ticket_status;
