//! Client-side validation
//!
//! Checks run before any backend call. Each check records failures into a
//! [`ValidationErrors`] so a form can show every problem at once.

mod account;
mod stock;

use rust_decimal::Decimal;

use crate::error::ValidationErrors;

pub use account::*;
pub use stock::*;

/// Machine-readable failure codes.
pub mod codes {
    pub const REQUIRED: &str = "required";
    pub const POSITIVE: &str = "positive";
    pub const NON_NEGATIVE: &str = "non_negative";
    pub const TOO_FEW_WORDS: &str = "too_few_words";
    pub const INSUFFICIENT_STOCK: &str = "insufficient_stock";
    pub const SAME_LOCATION: &str = "same_location";
    pub const INVALID_EMAIL: &str = "invalid_email";
    pub const WEAK_PASSWORD: &str = "weak_password";
    pub const DATE_ORDER: &str = "date_order";
    pub const OUT_OF_RANGE: &str = "out_of_range";
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Trimmed text, or `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Requires a non-blank value. Returns whether it was present.
pub fn require_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> bool {
    if non_blank(value).is_some() {
        true
    } else {
        errors.push_code(field, "This field is required", codes::REQUIRED);
        false
    }
}

/// Requires at least `min` words.
pub fn require_min_words(errors: &mut ValidationErrors, field: &str, value: Option<&str>, min: usize) {
    match non_blank(value) {
        None => errors.push_code(field, "This field is required", codes::REQUIRED),
        Some(text) if word_count(text) < min => {
            errors.push_code(field, format!("Please enter at least {min} words"), codes::TOO_FEW_WORDS)
        }
        Some(_) => {}
    }
}

/// Requires `value >= 0`.
pub fn require_non_negative(errors: &mut ValidationErrors, field: &str, value: Decimal) {
    if value.is_sign_negative() && !value.is_zero() {
        errors.push_code(field, "Must not be negative", codes::NON_NEGATIVE);
    }
}

/// Requires `value > 0`.
pub fn require_positive(errors: &mut ValidationErrors, field: &str, value: Decimal) {
    if value <= Decimal::ZERO {
        errors.push_code(field, "Must be greater than zero", codes::POSITIVE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  damaged  in\ttransit \n"), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_require_min_words() {
        let mut errors = ValidationErrors::new();
        require_min_words(&mut errors, "reason", Some("   "), 3);
        require_min_words(&mut errors, "notes", Some("too short"), 3);
        require_min_words(&mut errors, "ok", Some("long enough here"), 3);
        assert!(errors.has_code("reason", codes::REQUIRED));
        assert!(errors.has_code("notes", codes::TOO_FEW_WORDS));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_numbers() {
        let mut errors = ValidationErrors::new();
        require_non_negative(&mut errors, "a", Decimal::ZERO);
        require_non_negative(&mut errors, "b", Decimal::NEGATIVE_ONE);
        require_positive(&mut errors, "c", Decimal::ZERO);
        assert!(errors.for_field("a").is_none());
        assert!(errors.has_code("b", codes::NON_NEGATIVE));
        assert!(errors.has_code("c", codes::POSITIVE));
    }
}
