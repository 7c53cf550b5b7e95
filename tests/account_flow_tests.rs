use std::sync::Arc;

use gatehouse::config::Config;
use gatehouse::db::Store;
use gatehouse::services::account_service::{AnswerSubmission, RegisterRequest};
use gatehouse::services::{AccountError, MemoryNotifier};
use gatehouse::state::SharedState;

/// Cheap hashing parameters so test runs are not dominated by Argon2.
fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.argon2_memory_cost_kib = 8;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_state(config: Config) -> (SharedState, Arc<MemoryNotifier>) {
    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open in-memory store");
    let notifier = Arc::new(MemoryNotifier::new());
    let state = SharedState::with_parts(config, store, notifier.clone());
    (state, notifier)
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "Sunny123!".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role: "User".to_string(),
        address: Some("12 Analytical Way".to_string()),
        date_of_birth: Some("1990-12-10".to_string()),
        profile_picture: None,
        security_answers: vec![
            AnswerSubmission {
                question_id: 1,
                answer: "Blue".to_string(),
            },
            AnswerSubmission {
                question_id: 2,
                answer: " Pizza ".to_string(),
            },
        ],
    }
}

/// Registers and approves an account, returning its username.
async fn active_user(state: &SharedState, email: &str) -> String {
    let outcome = state
        .account_service
        .register(register_request(email))
        .await
        .expect("registration failed");
    state
        .account_service
        .approve_user(outcome.user_id)
        .await
        .expect("approval failed");
    outcome.username
}

#[tokio::test]
async fn test_register_approve_login() {
    let (state, notifier) = spawn_state(test_config()).await;

    let outcome = state
        .account_service
        .register(register_request("ada@example.com"))
        .await
        .unwrap();

    // {first initial}{last name}{MMYY}
    assert!(outcome.username.starts_with("alovelace"));
    assert_eq!(outcome.username.len(), "alovelace".len() + 4);

    // Pending accounts cannot log in yet
    let err = state
        .account_service
        .login(&outcome.username, "Sunny123!")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AccountNotActive));

    state
        .account_service
        .approve_user(outcome.user_id)
        .await
        .unwrap();

    let login = state
        .account_service
        .login(&outcome.username, "Sunny123!")
        .await
        .unwrap();
    assert_eq!(login.profile.email, "ada@example.com");
    assert_eq!(login.profile.role, "User");
    assert!(!login.session_token.is_empty());

    // One admin notification for the request, one approval mail to the user
    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].body.contains("approve-user"));
    assert_eq!(sent[1].to, "ada@example.com");
}

#[tokio::test]
async fn test_unknown_user_login() {
    let (state, _) = spawn_state(test_config()).await;

    let err = state
        .account_service
        .login("nobody0126", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AccountNotFound));
}

#[tokio::test]
async fn test_failed_attempts_suspend_account() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    for expected_remaining in [2u32, 1] {
        let err = state
            .account_service
            .login(&username, "Wrong123!")
            .await
            .unwrap_err();
        match err {
            AccountError::InvalidCredentials { remaining_attempts } => {
                assert_eq!(remaining_attempts, expected_remaining);
            }
            other => panic!("expected InvalidCredentials, got {other:?}"),
        }
    }

    // Third failure crosses the threshold
    let err = state
        .account_service
        .login(&username, "Wrong123!")
        .await
        .unwrap_err();
    let AccountError::AccountSuspended { remaining } = err else {
        panic!("expected AccountSuspended");
    };
    assert!(remaining.as_secs() <= 30 * 60);
    assert!(remaining.as_secs() > 29 * 60);
    assert!(err_message_mentions_minutes(&AccountError::AccountSuspended { remaining }));

    // Even the correct password is refused while suspended, and the window
    // keeps counting down rather than restarting
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let err = state
        .account_service
        .login(&username, "Sunny123!")
        .await
        .unwrap_err();
    let AccountError::AccountSuspended {
        remaining: remaining_later,
    } = err
    else {
        panic!("expected AccountSuspended");
    };
    assert!(remaining_later < remaining);
}

fn err_message_mentions_minutes(err: &AccountError) -> bool {
    let msg = err.to_string();
    msg.contains("minute") || msg.contains("hour")
}

#[tokio::test]
async fn test_lapsed_suspension_is_lifted_on_login() {
    let mut config = test_config();
    config.policy.suspension_minutes = 0;
    let (state, _) = spawn_state(config).await;
    let username = active_user(&state, "ada@example.com").await;

    for _ in 0..3 {
        let _ = state
            .account_service
            .login(&username, "Wrong123!")
            .await
            .unwrap_err();
    }

    // Zero-length window means the suspension has already lapsed; the next
    // login clears it and succeeds with a fresh attempt counter.
    let login = state
        .account_service
        .login(&username, "Sunny123!")
        .await
        .unwrap();
    assert_eq!(login.profile.username, username);

    let user = state
        .store
        .find_user_by_username(&username)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_suspended);
    assert_eq!(user.login_attempts, 0);
}

#[tokio::test]
async fn test_successful_login_resets_attempt_counter() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let _ = state
        .account_service
        .login(&username, "Wrong123!")
        .await
        .unwrap_err();
    let _ = state
        .account_service
        .login(&username, "Sunny123!")
        .await
        .unwrap();

    // Two fresh failures after the reset must not suspend
    for _ in 0..2 {
        let err = state
            .account_service
            .login(&username, "Wrong123!")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials { .. }));
    }
}

#[tokio::test]
async fn test_expired_password_blocks_login() {
    let mut config = test_config();
    config.policy.password_expiry_days = 0;
    let (state, _) = spawn_state(config).await;
    let username = active_user(&state, "ada@example.com").await;

    let err = state
        .account_service
        .login(&username, "Sunny123!")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::PasswordExpired));
}

#[tokio::test]
async fn test_full_password_reset_flow() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let issued = state
        .account_service
        .forgot_password(&username, Some("ada@example.com"))
        .await
        .unwrap();
    assert_eq!(issued.token.len(), 64);

    let questions = state
        .account_service
        .security_questions_for_token(&issued.token)
        .await
        .unwrap();
    assert_eq!(questions.len(), 2);

    // Matching is case-insensitive and whitespace-tolerant
    let answers = vec![
        AnswerSubmission {
            question_id: 1,
            answer: "  BLUE ".to_string(),
        },
        AnswerSubmission {
            question_id: 2,
            answer: "pizza".to_string(),
        },
    ];
    state
        .account_service
        .verify_security_answers(&issued.token, &answers)
        .await
        .unwrap();

    state
        .account_service
        .reset_password(&issued.token, "Rainy456?")
        .await
        .unwrap();

    let err = state
        .account_service
        .login(&username, "Sunny123!")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::InvalidCredentials { .. }));

    let login = state
        .account_service
        .login(&username, "Rainy456?")
        .await
        .unwrap();
    assert_eq!(login.profile.username, username);
}

#[tokio::test]
async fn test_security_answers_must_all_match() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let issued = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();

    // One right, one wrong
    let err = state
        .account_service
        .verify_security_answers(
            &issued.token,
            &[
                AnswerSubmission {
                    question_id: 1,
                    answer: "blue".to_string(),
                },
                AnswerSubmission {
                    question_id: 2,
                    answer: "sushi".to_string(),
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::SecurityAnswerMismatch));

    // A partial submission is also a mismatch
    let err = state
        .account_service
        .verify_security_answers(
            &issued.token,
            &[AnswerSubmission {
                question_id: 1,
                answer: "blue".to_string(),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::SecurityAnswerMismatch));
}

#[tokio::test]
async fn test_password_reuse_is_rejected() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let issued = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();

    let err = state
        .account_service
        .reset_password(&issued.token, "Sunny123!")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::PasswordReused));

    // The rejected attempt must not consume the token
    state
        .account_service
        .reset_password(&issued.token, "Rainy456?")
        .await
        .unwrap();

    // Changing back to the original is refused even after rotation
    let issued = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();
    let err = state
        .account_service
        .reset_password(&issued.token, "Sunny123!")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::PasswordReused));
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let issued = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();

    state
        .account_service
        .reset_password(&issued.token, "Rainy456?")
        .await
        .unwrap();

    let err = state
        .account_service
        .reset_password(&issued.token, "Windy789#")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_expired_reset_token_is_refused() {
    let mut config = test_config();
    config.policy.reset_token_minutes = 0;
    let (state, _) = spawn_state(config).await;
    let username = active_user(&state, "ada@example.com").await;

    let issued = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();

    // Zero-minute validity expires immediately
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let err = state
        .account_service
        .security_questions_for_token(&issued.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_new_token_invalidates_previous() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let first = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();
    let second = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();
    assert_ne!(first.token, second.token);

    let err = state
        .account_service
        .security_questions_for_token(&first.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_password_history_keeps_one_current_entry() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let user = state
        .store
        .find_user_by_username(&username)
        .await
        .unwrap()
        .unwrap();

    let issued = state
        .account_service
        .forgot_password(&username, None)
        .await
        .unwrap();
    state
        .account_service
        .reset_password(&issued.token, "Rainy456?")
        .await
        .unwrap();

    let hashes = state.store.password_hashes_for_user(user.id).await.unwrap();
    assert_eq!(hashes.len(), 2);

    let current = state
        .store
        .current_password_entry(user.id)
        .await
        .unwrap()
        .expect("no current entry");
    let refreshed = state
        .store
        .find_user_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.password_hash, refreshed.password_hash);

    // Exactly one unexpired entry survives the rollover
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    let unexpired = gatehouse::entities::password_history::Entity::find()
        .filter(gatehouse::entities::password_history::Column::UserId.eq(user.id))
        .filter(gatehouse::entities::password_history::Column::IsExpired.eq(false))
        .all(&state.store.conn)
        .await
        .unwrap();
    assert_eq!(unexpired.len(), 1);
}

#[tokio::test]
async fn test_registration_rejects_bad_input() {
    let (state, _) = spawn_state(test_config()).await;

    let mut dup = register_request("dup@example.com");
    dup.security_answers = vec![
        AnswerSubmission {
            question_id: 1,
            answer: "blue".to_string(),
        },
        AnswerSubmission {
            question_id: 1,
            answer: "red".to_string(),
        },
    ];
    let err = state.account_service.register(dup).await.unwrap_err();
    assert!(matches!(err, AccountError::DuplicateSecurityQuestion));

    let mut unknown_question = register_request("uq@example.com");
    unknown_question.security_answers = vec![AnswerSubmission {
        question_id: 99,
        answer: "blue".to_string(),
    }];
    let err = state
        .account_service
        .register(unknown_question)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::SecurityQuestionNotFound));

    let mut bad_role = register_request("br@example.com");
    bad_role.role = "Overlord".to_string();
    let err = state.account_service.register(bad_role).await.unwrap_err();
    assert!(matches!(err, AccountError::RoleNotFound));

    state
        .account_service
        .register(register_request("taken@example.com"))
        .await
        .unwrap();
    let err = state
        .account_service
        .register(register_request("taken@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::EmailAlreadyInUse));
}

#[tokio::test]
async fn test_access_requests_are_terminal() {
    let (state, notifier) = spawn_state(test_config()).await;

    let outcome = state
        .account_service
        .register(register_request("ada@example.com"))
        .await
        .unwrap();

    state
        .account_service
        .approve_user(outcome.user_id)
        .await
        .unwrap();

    let err = state
        .account_service
        .approve_user(outcome.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AlreadyApproved));

    // Approval is terminal; rejection after the fact is refused
    let err = state
        .account_service
        .reject_user(outcome.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AlreadyApproved));

    // Only the original request mail and one approval mail went out
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_rejection_is_terminal() {
    let (state, _) = spawn_state(test_config()).await;

    let outcome = state
        .account_service
        .register(register_request("ada@example.com"))
        .await
        .unwrap();

    state
        .account_service
        .reject_user(outcome.user_id)
        .await
        .unwrap();

    let err = state
        .account_service
        .reject_user(outcome.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AlreadyRejected));

    // Rejected accounts stay inactive
    let user = state
        .store
        .find_user_by_id(outcome.user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_active);
}

#[tokio::test]
async fn test_approve_unknown_user() {
    let (state, _) = spawn_state(test_config()).await;

    let err = state.account_service.approve_user(999).await.unwrap_err();
    assert!(matches!(err, AccountError::AccountNotFound));

    let err = state.account_service.reject_user(999).await.unwrap_err();
    assert!(matches!(err, AccountError::AccountNotFound));
}

#[tokio::test]
async fn test_notifier_failure_keeps_registration() {
    let (state, notifier) = spawn_state(test_config()).await;
    notifier.fail_next_sends(true);

    let err = state
        .account_service
        .register(register_request("ada@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Notification(_)));

    // The account and its pending request were committed before the send
    let user = state
        .store
        .find_user_by_email("ada@example.com")
        .await
        .unwrap()
        .expect("user was not persisted");
    assert!(!user.is_active);
    assert!(
        state
            .store
            .find_pending_access_request(user.id)
            .await
            .unwrap()
            .is_some()
    );

    // Approval still works once the channel recovers
    notifier.fail_next_sends(false);
    state.account_service.approve_user(user.id).await.unwrap();
}

#[tokio::test]
async fn test_forgot_password_checks_email_when_given() {
    let (state, _) = spawn_state(test_config()).await;
    let username = active_user(&state, "ada@example.com").await;

    let err = state
        .account_service
        .forgot_password(&username, Some("other@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AccountNotFound));

    // Email comparison is case-insensitive
    state
        .account_service
        .forgot_password(&username, Some("ADA@example.com"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_question_catalog_is_seeded() {
    let (state, _) = spawn_state(test_config()).await;

    let questions = state
        .account_service
        .list_security_questions()
        .await
        .unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().any(|q| q.question.contains("color")));
}
