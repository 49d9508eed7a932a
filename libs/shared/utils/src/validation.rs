use std::sync::OnceLock;

use regex::Regex;

use shared_models::error::AppError;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

pub fn require_email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::ValidationError("Invalid email address".to_string()))
    }
}

/// Character-count check used by the registration forms.
pub fn require_min_len(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.trim().chars().count() < min {
        return Err(AppError::ValidationError(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    Ok(())
}

pub fn require_password_pair(password: &str, confirm_password: &str) -> Result<(), AppError> {
    require_min_len("Password", password, 6)?;
    if password != confirm_password {
        return Err(AppError::ValidationError("Passwords don't match".to_string()));
    }
    Ok(())
}
