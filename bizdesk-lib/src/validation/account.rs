//! Email and password rules

use super::codes;
use crate::error::ValidationErrors;

/// Minimum password length.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Checks the shape of an email address.
pub fn check_email(errors: &mut ValidationErrors, field: &str, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.push_code(field, "Email is required", codes::REQUIRED);
        return;
    }
    if !is_valid_email(email) {
        errors.push_code(field, "Enter a valid email address", codes::INVALID_EMAIL);
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Checks password strength: minimum length, at least one letter and one digit.
pub fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    if password.is_empty() {
        errors.push_code(field, "Password is required", codes::REQUIRED);
        return;
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.push_code(
            field,
            format!("Password must be at least {PASSWORD_MIN_LEN} characters"),
            codes::WEAK_PASSWORD,
        );
    } else if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push_code(field, "Password must contain a letter and a number", codes::WEAK_PASSWORD);
    }
}

/// Validates a single email address.
pub fn validate_email(field: &str, email: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, field, email);
    errors.into_result()
}

/// Validates a single password.
pub fn validate_password(field: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_password(&mut errors, field, password);
    errors.into_result()
}

/// Lowercased domain part of an email address.
pub fn email_domain(email: &str) -> Option<String> {
    email
        .trim()
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}
