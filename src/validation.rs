/// Input validation
///
/// Field-level checks for registration, login, and password reset. Emails are
/// normalized (trim + lowercase) before every lookup or store, so equality is
/// case-insensitive by construction.
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

/// Symbols accepted by the password policy
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

pub const PASSWORD_MIN_LEN: usize = 8;
/// Upper bound keeps adaptive hashing cost bounded on attacker-sized inputs
pub const PASSWORD_MAX_LEN: usize = 128;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validation result with detailed errors
pub type ValidationResult = Result<(), Vec<FieldError>>;

/// Trim and lowercase an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check email shape on the already-normalized value
pub fn check_email(email: &str) -> Option<FieldError> {
    if !email.validate_email() {
        return Some(FieldError::new("email", "Email format is invalid"));
    }
    None
}

/// Password policy: length bounds plus one of each character class
pub fn check_password_policy(password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if password.len() < PASSWORD_MIN_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {} characters", PASSWORD_MIN_LEN),
        ));
    }
    if password.len() > PASSWORD_MAX_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at most {} characters", PASSWORD_MAX_LEN),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(FieldError::new(
            "password",
            "Password must contain an uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(FieldError::new(
            "password",
            "Password must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(
            "password",
            "Password must contain a digit",
        ));
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        errors.push(FieldError::new(
            "password",
            format!("Password must contain a symbol from {}", PASSWORD_SYMBOLS),
        ));
    }

    errors
}

fn check_name(name: &str) -> Option<FieldError> {
    let len = name.trim().chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Some(FieldError::new(
            "name",
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_LEN, NAME_MAX_LEN
            ),
        ));
    }
    None
}

/// Registration: name + email shape + full password policy
pub fn validate_registration(name: &str, email: &str, password: &str) -> ValidationResult {
    let mut errors = Vec::new();
    if let Some(e) = check_name(name) {
        errors.push(e);
    }
    if let Some(e) = check_email(email) {
        errors.push(e);
    }
    errors.extend(check_password_policy(password));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Login: shape only. Policy violations must not fail here, otherwise
/// responses would reveal which registered passwords predate a policy change.
pub fn validate_login(email: &str, password: &str) -> ValidationResult {
    let mut errors = Vec::new();
    if let Some(e) = check_email(email) {
        errors.push(e);
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email_case_and_whitespace() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(check_email("not-an-email").is_some());
        assert!(check_email("alice@example.com").is_none());
    }

    #[test]
    fn password_policy_requires_all_classes() {
        assert!(check_password_policy("Str0ng!Pass").is_empty());

        let missing_symbol = check_password_policy("Str0ngPass");
        assert_eq!(missing_symbol.len(), 1);
        assert_eq!(missing_symbol[0].field, "password");

        // short, no upper, no digit, no symbol
        let weak = check_password_policy("abc");
        assert!(weak.len() >= 4);
    }

    #[test]
    fn password_length_bounds() {
        assert!(!check_password_policy("Aa1!aaa").is_empty()); // 7 chars
        assert!(check_password_policy("Aa1!aaaa").is_empty()); // 8 chars

        let oversized = format!("Aa1!{}", "a".repeat(130));
        assert!(!check_password_policy(&oversized).is_empty());
    }

    #[test]
    fn registration_collects_all_field_errors() {
        let err = validate_registration("x", "bad", "weak").unwrap_err();
        let fields: Vec<&str> = err.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[test]
    fn login_checks_shape_not_policy() {
        // A password that violates current policy must still pass login
        // validation; only emptiness is rejected.
        assert!(validate_login("alice@example.com", "legacy").is_ok());
        assert!(validate_login("alice@example.com", "").is_err());
    }
}
