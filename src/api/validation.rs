use std::sync::OnceLock;

use super::ApiError;
use super::types::AnswerBody;
use crate::constants::limits::{MAX_SECURITY_QUESTIONS, MIN_PASSWORD_LEN, MIN_SECURITY_QUESTIONS};

fn email_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^[\w.+-]+@[\w-]+(\.[\w-]+)+$").unwrap_or_else(|_| unreachable!())
    })
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if email_regex().is_match(email) {
        Ok(email)
    } else {
        Err(ApiError::validation("Invalid email address"))
    }
}

/// Password policy: minimum length, must begin with a letter, and must
/// contain at least one digit and one special character.
pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if !password.chars().next().is_some_and(|c| c.is_alphabetic()) {
        return Err(ApiError::validation("Password must start with a letter"));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation(
            "Password must contain at least one number",
        ));
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(ApiError::validation(
            "Password must contain at least one special character",
        ));
    }

    Ok(password)
}

pub fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub fn validate_security_answers(answers: &[AnswerBody]) -> Result<(), ApiError> {
    if !(MIN_SECURITY_QUESTIONS..=MAX_SECURITY_QUESTIONS).contains(&answers.len()) {
        return Err(ApiError::validation(format!(
            "Between {} and {} security questions must be answered",
            MIN_SECURITY_QUESTIONS, MAX_SECURITY_QUESTIONS
        )));
    }

    if answers.iter().any(|a| a.answer.trim().is_empty()) {
        return Err(ApiError::validation("Security answers cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@domain").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Password1!").is_ok());
        assert!(validate_password("short1!").is_err());
        assert!(validate_password("1Password!").is_err());
        assert!(validate_password("Password!!").is_err());
        assert!(validate_password("Password11").is_err());
    }

    #[test]
    fn test_validate_security_answers() {
        let one = vec![AnswerBody {
            question_id: 1,
            answer: "blue".to_string(),
        }];
        assert!(validate_security_answers(&one).is_ok());

        assert!(validate_security_answers(&[]).is_err());

        let four: Vec<AnswerBody> = (1..=4)
            .map(|i| AnswerBody {
                question_id: i,
                answer: "x".to_string(),
            })
            .collect();
        assert!(validate_security_answers(&four).is_err());

        let blank = vec![AnswerBody {
            question_id: 1,
            answer: "   ".to_string(),
        }];
        assert!(validate_security_answers(&blank).is_err());
    }
}
