pub mod claims;
pub mod login;
pub mod session;
pub mod signup;

pub use login::handle_login;
pub use login::handle_me;
pub use signup::handle_send_code;
pub use signup::handle_signup;
