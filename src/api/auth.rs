use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, validation};
use super::types::{
    ForgotPasswordBody, LoginBody, LoginDto, MessageDto, QuestionDto, RegisterBody, RegisterDto,
    ResetTokenDto,
};
use crate::services::account_service::{AnswerSubmission, RegisterRequest};

pub const SESSION_USER_KEY: &str = "user";

/// POST /auth/register
/// Creates a pending account and files an access request for admin review.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_email(&payload.email)?;
    validation::validate_password(&payload.password)?;
    validation::validate_name("First name", &payload.first_name)?;
    validation::validate_name("Last name", &payload.last_name)?;
    validation::validate_security_answers(&payload.security_answers)?;

    let outcome = state
        .accounts()
        .register(RegisterRequest {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: payload.role,
            address: Some(payload.address),
            date_of_birth: Some(payload.date_of_birth),
            profile_picture: payload.profile_picture,
            security_answers: payload
                .security_answers
                .into_iter()
                .map(|a| AnswerSubmission {
                    question_id: a.question_id,
                    answer: a.answer,
                })
                .collect(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterDto {
            user_id: outcome.user_id,
            username: outcome.username,
            message: "Account request submitted for approval".to_string(),
        })),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginBody>,
) -> Result<Json<ApiResponse<LoginDto>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let outcome = state
        .accounts()
        .login(&payload.username, &payload.password)
        .await?;

    session
        .insert(SESSION_USER_KEY, &outcome.profile.username)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(LoginDto {
        username: outcome.profile.username,
        email: outcome.profile.email,
        first_name: outcome.profile.first_name,
        last_name: outcome.profile.last_name,
        role: outcome.profile.role,
        profile_picture: outcome.profile.profile_picture,
    })))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "Logged out".to_string(),
    })))
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordBody>,
) -> Result<Json<ApiResponse<ResetTokenDto>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }

    let issued = state
        .accounts()
        .forgot_password(&payload.username, payload.email.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(ResetTokenDto {
        token: issued.token,
        expires_at: issued.expires_at,
    })))
}

/// GET /auth/security-questions
/// Lists the full question catalog for the registration form.
pub async fn list_security_questions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<QuestionDto>>>, ApiError> {
    let questions = state.accounts().list_security_questions().await?;

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

/// POST /auth/approve-user/{id}
pub async fn approve_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    state.accounts().approve_user(user_id).await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "User account approved".to_string(),
    })))
}

/// POST /auth/reject-user/{id}
pub async fn reject_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    state.accounts().reject_user(user_id).await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "User account rejected".to_string(),
    })))
}
