pub mod registration;
pub mod session;

pub use registration::{register, resend_code, verify_email};
pub use session::{login, refresh_token};
