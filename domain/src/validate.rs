//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::CoreError;

/// Largest identifier accepted for EINs and SSNs (nine decimal digits).
pub const MAX_IDENTIFIER: u64 = 999_999_999;

/// Validate a numeric record identifier: non-zero and at most nine digits.
pub fn validate_identifier(kind: &str, value: u64) -> Result<(), CoreError> {
    if value == 0 {
        return Err(CoreError::InvalidInput(format!("{} must be non-zero", kind)));
    }
    if value > MAX_IDENTIFIER {
        return Err(CoreError::InvalidInput(format!(
            "{} must have at most nine digits",
            kind
        )));
    }
    Ok(())
}

/// Validate an email address. Full RFC compliance is not required: one `@`,
/// a non-empty local part, a dotted domain and no whitespace.
pub fn validate_email(s: &str) -> Result<(), CoreError> {
    let invalid = |msg: &str| CoreError::InvalidInput(format!("invalid email: {}", msg));
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    let Some((local, domain)) = s.split_once('@') else {
        return Err(invalid("missing @"));
    };
    if local.is_empty() {
        return Err(invalid("empty local part"));
    }
    if domain.contains('@') {
        return Err(invalid("multiple @"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("malformed domain"));
    }
    Ok(())
}
