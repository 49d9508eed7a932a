use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Application role. Only ever read from `app_metadata`, which clients cannot write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Doctor => "doctor",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, decoded from the bearer token and handed to
/// each handler through request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    /// Raw JWT `role` claim (`authenticated`, `service_role`, ...).
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub app_metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn user_role(&self) -> UserRole {
        let role = self
            .app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str());

        match role {
            Some("admin") => UserRole::Admin,
            Some("doctor") => UserRole::Doctor,
            _ => UserRole::Patient,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user_role() == UserRole::Admin
    }

    pub fn is_doctor(&self) -> bool {
        self.user_role() == UserRole::Doctor
    }

    pub fn full_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("full_name"))
            .and_then(|name| name.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(app_metadata: Option<serde_json::Value>, metadata: Option<serde_json::Value>) -> User {
        User {
            id: "u1".to_string(),
            email: None,
            role: Some("authenticated".to_string()),
            metadata,
            app_metadata,
            created_at: None,
        }
    }

    #[test]
    fn role_comes_from_app_metadata() {
        assert_eq!(user(Some(json!({"role": "doctor"})), None).user_role(), UserRole::Doctor);
        assert_eq!(user(Some(json!({"role": "admin"})), None).user_role(), UserRole::Admin);
        assert_eq!(user(None, None).user_role(), UserRole::Patient);
    }

    #[test]
    fn user_metadata_role_is_ignored() {
        let u = user(None, Some(json!({"role": "doctor", "full_name": "Ana"})));
        assert_eq!(u.user_role(), UserRole::Patient);
        assert_eq!(u.full_name(), Some("Ana"));
    }
}
