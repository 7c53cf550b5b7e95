pub mod prelude;

pub mod access_requests;
pub mod password_history;
pub mod roles;
pub mod security_questions;
pub mod user_security_answers;
pub mod users;
