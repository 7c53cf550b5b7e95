pub use super::access_requests::Entity as AccessRequests;
pub use super::password_history::Entity as PasswordHistory;
pub use super::roles::Entity as Roles;
pub use super::security_questions::Entity as SecurityQuestions;
pub use super::user_security_answers::Entity as UserSecurityAnswers;
pub use super::users::Entity as Users;
