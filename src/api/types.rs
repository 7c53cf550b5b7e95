use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub address: String,
    pub date_of_birth: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    pub security_answers: Vec<AnswerBody>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    pub question_id: i32,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterDto {
    pub user_id: i32,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginDto {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenDto {
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyAnswersBody {
    pub answers: Vec<AnswerBody>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionDto {
    pub id: i32,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct MessageDto {
    pub message: String,
}
