use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::SESSION_USER_KEY;
use super::types::{AnswerBody, MessageDto, QuestionDto, ResetPasswordBody, VerifyAnswersBody};
use super::{ApiError, ApiResponse, AppState, validation};
use crate::services::account_service::AnswerSubmission;

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// GET /users/security-questions?token=
/// Returns the questions assigned to the account the reset token belongs to.
pub async fn security_questions_for_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ApiResponse<Vec<QuestionDto>>>, ApiError> {
    let questions = state
        .accounts()
        .security_questions_for_token(&query.token)
        .await?;

    Ok(Json(ApiResponse::success(
        questions
            .into_iter()
            .map(|q| QuestionDto {
                id: q.id,
                question: q.question,
            })
            .collect(),
    )))
}

/// POST /users/security-questions/verify?token=
pub async fn verify_security_answers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
    Json(payload): Json<VerifyAnswersBody>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    let answers: Vec<AnswerSubmission> = payload
        .answers
        .into_iter()
        .map(|a: AnswerBody| AnswerSubmission {
            question_id: a.question_id,
            answer: a.answer,
        })
        .collect();

    state
        .accounts()
        .verify_security_answers(&query.token, &answers)
        .await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "Security answers verified".to_string(),
    })))
}

/// POST /auth/reset-password?token=
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
    Json(payload): Json<ResetPasswordBody>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    validation::validate_password(&payload.new_password)?;

    state
        .accounts()
        .reset_password(&query.token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "Password has been reset".to_string(),
    })))
}

/// GET /users/dashboard
/// Session-gated profile lookup for the logged-in account.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<crate::services::account_service::UserProfile>>, ApiError> {
    let username: String = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

    let profile = state.accounts().profile(&username).await?;

    Ok(Json(ApiResponse::success(profile)))
}
