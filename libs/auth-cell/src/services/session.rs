use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};
use shared_models::error::AppError;
use shared_utils::validation::{require_email, require_min_len, require_password_pair};

use crate::models::{AuthError, AuthUser, Session, SignInRequest, SignUpOutcome, SignUpRequest};

fn validation(err: AppError) -> AuthError {
    match err {
        AppError::ValidationError(msg) => AuthError::ValidationError(msg),
        other => AuthError::ValidationError(other.to_string()),
    }
}

/// Thin wrapper over the GoTrue endpoints the clinic uses.
pub struct SessionService {
    supabase: SupabaseClient,
    admin: Option<SupabaseClient>,
}

impl SessionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            admin: config
                .has_service_role()
                .then(|| SupabaseClient::service_role(config)),
        }
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<Session, AuthError> {
        debug!("Signing in {}", request.email);

        let result = self.supabase.request::<Session>(
            Method::POST,
            "/auth/v1/token?grant_type=password",
            None,
            Some(json!({ "email": request.email, "password": request.password })),
        ).await;

        match result {
            Ok(session) => Ok(session),
            Err(SupabaseError::Api { status: 400, .. }) | Err(SupabaseError::Auth(_)) => {
                warn!("Rejected sign-in for {}", request.email);
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate_sign_up(request: &SignUpRequest) -> Result<(), AuthError> {
        require_min_len("Full name", &request.full_name, 2).map_err(validation)?;
        require_email(&request.email).map_err(validation)?;
        require_password_pair(&request.password, &request.confirm_password).map_err(validation)?;
        if request.age <= 0 {
            return Err(AuthError::ValidationError("Age must be a positive number".to_string()));
        }
        Ok(())
    }

    /// Creates the auth user and the matching `patients` row.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        Self::validate_sign_up(&request)?;

        let email = request.email.trim().to_string();
        let result = self.supabase.request::<Value>(
            Method::POST,
            "/auth/v1/signup",
            None,
            Some(json!({
                "email": email,
                "password": request.password,
                "data": { "full_name": request.full_name }
            })),
        ).await;

        let body = match result {
            Ok(body) => body,
            Err(SupabaseError::Api { status: 422, .. }) | Err(SupabaseError::Conflict(_)) => {
                return Err(AuthError::AlreadyRegistered(email));
            }
            Err(SupabaseError::Api { status: 400, message }) if message.contains("already registered") => {
                return Err(AuthError::AlreadyRegistered(email));
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = Self::parse_sign_up(body)?;
        let row = json!({
            "id": outcome.user.id,
            "name": request.full_name,
            "email": email,
            "age": request.age,
        });

        if let Err(e) = self.insert_patient_row(&outcome, row).await {
            warn!("Patient row for {} was not written: {}", outcome.user.id, e);
            self.delete_auth_user(&outcome.user.id).await;
            return Err(e);
        }

        info!("Registered patient {}", outcome.user.id);
        Ok(outcome)
    }

    /// Unconfirmed sign-ups carry no session, so the row goes through the
    /// service role. Without it only the new user's own session can pass the
    /// `id = auth.uid()` policy.
    async fn insert_patient_row(&self, outcome: &SignUpOutcome, row: Value) -> Result<(), AuthError> {
        if let Some(admin) = &self.admin {
            admin.insert::<Value>("patients", Some(admin.api_key()), row).await?;
            return Ok(());
        }

        match &outcome.session {
            Some(session) => {
                self.supabase
                    .insert::<Value>("patients", Some(&session.access_token), row)
                    .await?;
                Ok(())
            }
            None => Err(AuthError::ServiceError(
                "Account awaits email confirmation and no service-role key is configured to create the patient profile".to_string(),
            )),
        }
    }

    async fn delete_auth_user(&self, user_id: &str) {
        let Some(admin) = &self.admin else {
            warn!("No service-role key, auth user {} is left without a patient row", user_id);
            return;
        };

        let path = format!("/auth/v1/admin/users/{}", user_id);
        if let Err(e) = admin
            .execute(Method::DELETE, &path, Some(admin.api_key()), None)
            .await
        {
            warn!("Could not remove auth user {} after failed sign-up: {}", user_id, e);
        }
    }

    /// GoTrue answers sign-up with a session when auto-confirm is on and with
    /// the bare user otherwise.
    fn parse_sign_up(body: Value) -> Result<SignUpOutcome, AuthError> {
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|e| AuthError::ServiceError(e.to_string()))?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user: AuthUser = serde_json::from_value(body)
            .map_err(|e| AuthError::ServiceError(e.to_string()))?;
        Ok(SignUpOutcome { user, session: None })
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.supabase
            .execute(Method::POST, "/auth/v1/logout", Some(access_token), None)
            .await?;
        Ok(())
    }

    pub async fn current_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let profile = self.supabase.get_user_profile(access_token).await?;
        serde_json::from_value(profile).map_err(|e| AuthError::ServiceError(e.to_string()))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let result = self.supabase.request::<Session>(
            Method::POST,
            "/auth/v1/token?grant_type=refresh_token",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        ).await;

        match result {
            Ok(session) => Ok(session),
            Err(SupabaseError::Api { status: 400, message }) => Err(AuthError::SessionExpired(message)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_full_name(&self, access_token: &str, full_name: &str) -> Result<AuthUser, AuthError> {
        require_min_len("Full name", full_name, 2).map_err(validation)?;

        Ok(self.supabase.request::<AuthUser>(
            Method::PUT,
            "/auth/v1/user",
            Some(access_token),
            Some(json!({ "data": { "full_name": full_name.trim() } })),
        ).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sign_up(age: i32, confirm: &str) -> SignUpRequest {
        SignUpRequest {
            full_name: "Ana Patient".to_string(),
            email: "ana@clinic.example".to_string(),
            password: "secret1".to_string(),
            confirm_password: confirm.to_string(),
            age,
        }
    }

    #[test]
    fn sign_up_rules() {
        assert!(SessionService::validate_sign_up(&sign_up(30, "secret1")).is_ok());
        assert_matches!(
            SessionService::validate_sign_up(&sign_up(30, "other1")),
            Err(AuthError::ValidationError(msg)) if msg == "Passwords don't match"
        );
        assert_matches!(
            SessionService::validate_sign_up(&sign_up(0, "secret1")),
            Err(AuthError::ValidationError(_))
        );
    }

    #[test]
    fn sign_up_without_confirmation_has_session() {
        let outcome = SessionService::parse_sign_up(json!({
            "access_token": "a",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": "u1", "email": "ana@clinic.example" }
        }))
        .unwrap();
        assert_eq!(outcome.user.id, "u1");
        assert!(outcome.session.is_some());

        let pending = SessionService::parse_sign_up(json!({ "id": "u2", "email": "b@clinic.example" })).unwrap();
        assert!(pending.session.is_none());
    }
}
