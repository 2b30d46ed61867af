//! Client-side form validation
//!
//! Every check here runs before any network call; a failure is an
//! `Error::Validation` carrying a user-facing message.

use common::Secret;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;

/// Message shown for any server-side current-password mismatch.
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Current password is incorrect";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    pub fn label(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        }
    }
}

/// Result of each password category check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordChecks {
    pub min_length: bool,
    pub lowercase: bool,
    pub uppercase: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordChecks {
    pub fn of(password: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
            lowercase: password.chars().any(char::is_lowercase),
            uppercase: password.chars().any(char::is_uppercase),
            digit: password.chars().any(|c| c.is_ascii_digit()),
            special: password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
        }
    }

    pub fn passed(&self) -> usize {
        [
            self.min_length,
            self.lowercase,
            self.uppercase,
            self.digit,
            self.special,
        ]
        .into_iter()
        .filter(|ok| *ok)
        .count()
    }

    /// Strong only when every check passes.
    pub fn strength(&self) -> PasswordStrength {
        match self.passed() {
            5 => PasswordStrength::Strong,
            3 | 4 => PasswordStrength::Medium,
            _ => PasswordStrength::Weak,
        }
    }

    /// Minimum bar for a new password: length, an uppercase letter, a digit.
    pub fn is_acceptable(&self) -> bool {
        self.min_length && self.uppercase && self.digit
    }
}

/// Reject a password below the minimum bar, otherwise report its strength.
pub fn validate_password(password: &str) -> Result<PasswordStrength> {
    let checks = PasswordChecks::of(password);
    if checks.is_acceptable() {
        return Ok(checks.strength());
    }
    let message = if !checks.min_length {
        format!("Password must be at least {MIN_PASSWORD_LENGTH} characters")
    } else if !checks.uppercase {
        "Password must contain an uppercase letter".to_string()
    } else {
        "Password must contain a digit".to_string()
    };
    Err(Error::Validation(message))
}

pub fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH || len > MAX_USERNAME_LENGTH {
        return Err(Error::Validation(format!(
            "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(Error::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let invalid = || Error::Validation("Please enter a valid email address".into());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Rewrite server password-mismatch messages to one consistent wording.
pub fn normalize_password_message(message: &str) -> String {
    let lower = message.to_lowercase();
    let about_password = lower.contains("password");
    let mismatch = ["incorrect", "does not match", "doesn't match", "mismatch", "wrong", "invalid"]
        .iter()
        .any(|needle| lower.contains(needle));
    if about_password && mismatch {
        PASSWORD_MISMATCH_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// Login form input.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: Secret<String>,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Validation("Username is required".into()));
        }
        if self.password.is_blank() {
            return Err(Error::Validation("Password is required".into()));
        }
        Ok(())
    }
}

/// Registration form input.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: Secret<String>,
    pub confirm_password: Secret<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegistrationForm {
    /// Validate every field; returns the password strength on success.
    pub fn validate(&self) -> Result<PasswordStrength> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        let strength = validate_password(self.password.expose())?;
        if self.password != self.confirm_password {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        Ok(strength)
    }
}

/// Own-profile update. The current password is required for any change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub current_password: Option<Secret<String>>,
    pub new_password: Option<Secret<String>>,
    pub confirm_password: Option<Secret<String>>,
}

impl ProfileUpdateForm {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.new_password.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Validation("Nothing to update".into()));
        }
        match &self.current_password {
            Some(p) if !p.is_blank() => {}
            _ => {
                return Err(Error::Validation(
                    "Current password is required to update your profile".into(),
                ));
            }
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(new_password) = &self.new_password {
            validate_password(new_password.expose())?;
            if self.confirm_password.as_ref() != Some(new_password) {
                return Err(Error::Validation("New passwords do not match".into()));
            }
            if self.current_password.as_ref() == Some(new_password) {
                return Err(Error::Validation(
                    "New password must differ from the current password".into(),
                ));
            }
        }
        Ok(())
    }

    /// PATCH body with only the fields being changed.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(v) = &self.username {
            body.insert("username".into(), json!(v.trim()));
        }
        if let Some(v) = &self.email {
            body.insert("email".into(), json!(v.trim()));
        }
        if let Some(v) = &self.first_name {
            body.insert("firstName".into(), json!(v));
        }
        if let Some(v) = &self.last_name {
            body.insert("lastName".into(), json!(v));
        }
        if let Some(v) = &self.current_password {
            body.insert("currentPassword".into(), json!(v.expose()));
        }
        if let Some(v) = &self.new_password {
            body.insert("newPassword".into(), json!(v.expose()));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_rejected() {
        let result = validate_password("Ab1!x");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn eight_chars_with_digit_and_uppercase_accepted() {
        let strength = validate_password("Abcdefg1").unwrap();
        assert_eq!(strength, PasswordStrength::Medium);
    }

    #[test]
    fn strong_only_when_all_checks_pass() {
        assert_eq!(validate_password("Abcdef1!").unwrap(), PasswordStrength::Strong);

        let checks = PasswordChecks::of("ABCDEFG1!");
        assert!(!checks.lowercase);
        assert_eq!(checks.strength(), PasswordStrength::Medium);
    }

    #[test]
    fn missing_uppercase_or_digit_rejected() {
        assert!(validate_password("abcdefg1").is_err());
        assert!(validate_password("Abcdefgh").is_err());
    }

    #[test]
    fn weak_classification() {
        let checks = PasswordChecks::of("abc");
        assert_eq!(checks.passed(), 1);
        assert_eq!(checks.strength(), PasswordStrength::Weak);
        assert!(!checks.is_acceptable());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("ada.l-99_x").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("reader@booknet.io").is_ok());
        assert!(validate_email("reader@booknet").is_err());
        assert!(validate_email("@booknet.io").is_err());
        assert!(validate_email("a@b@c.io").is_err());
        assert!(validate_email("a b@c.io").is_err());
        assert!(validate_email("reader@.io").is_err());
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let mut form = RegistrationForm {
            username: "reader".into(),
            email: "reader@booknet.io".into(),
            password: "Abcdef1!".into(),
            confirm_password: "Abcdef1?".into(),
            first_name: None,
            last_name: None,
        };
        assert!(form.validate().is_err());

        form.confirm_password = "Abcdef1!".into();
        assert_eq!(form.validate().unwrap(), PasswordStrength::Strong);
    }

    #[test]
    fn login_requires_both_fields() {
        assert!(LoginForm::new("", "x").validate().is_err());
        assert!(LoginForm::new("a", "").validate().is_err());
        assert!(LoginForm::new("a", "b").validate().is_ok());
    }

    #[test]
    fn profile_update_requires_current_password() {
        let form = ProfileUpdateForm {
            email: Some("new@booknet.io".into()),
            ..Default::default()
        };
        let err = form.validate().unwrap_err();
        assert!(err.to_string().contains("Current password is required"));
    }

    #[test]
    fn profile_update_body_only_has_changed_fields() {
        let form = ProfileUpdateForm {
            email: Some(" new@booknet.io ".into()),
            current_password: Some("Old-pass1".into()),
            ..Default::default()
        };
        form.validate().unwrap();
        let body = form.to_body();
        assert_eq!(body["email"], "new@booknet.io");
        assert_eq!(body["currentPassword"], "Old-pass1");
        assert!(body.get("username").is_none());
        assert!(body.get("newPassword").is_none());
    }

    #[test]
    fn profile_update_new_password_must_match_confirmation() {
        let form = ProfileUpdateForm {
            current_password: Some("Old-pass1".into()),
            new_password: Some("New-pass1".into()),
            confirm_password: Some("New-pass2".into()),
            ..Default::default()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn password_mismatch_messages_are_normalized() {
        assert_eq!(
            normalize_password_message("Password does not match"),
            PASSWORD_MISMATCH_MESSAGE
        );
        assert_eq!(
            normalize_password_message("Invalid current password"),
            PASSWORD_MISMATCH_MESSAGE
        );
        assert_eq!(
            normalize_password_message("Email already in use"),
            "Email already in use"
        );
    }
}
