pub mod access_request;
pub mod password_history;
pub mod role;
pub mod security_question;
pub mod user;
