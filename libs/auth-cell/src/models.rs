use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_database::SupabaseError;
use shared_models::auth::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Patient self-registration. Doctors are created by admins through the doctor cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
}

/// User object as GoTrue returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Option<Value>,
    #[serde(default)]
    pub user_metadata: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<AuthUser> for User {
    fn from(auth: AuthUser) -> Self {
        User {
            id: auth.id,
            email: auth.email,
            role: Some("authenticated".to_string()),
            metadata: auth.user_metadata,
            app_metadata: auth.app_metadata,
            created_at: auth.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: AuthUser,
}

/// What sign-up produced. `session` is absent when the project requires
/// email confirmation before the first sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session is no longer valid: {0}")]
    SessionExpired(String),

    #[error("A user with email {0} is already registered")]
    AlreadyRegistered(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Auth service error: {0}")]
    ServiceError(String),
}

impl From<SupabaseError> for AuthError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Auth(msg) => AuthError::SessionExpired(msg),
            other => AuthError::ServiceError(other.to_string()),
        }
    }
}
