//! Field validators used with `#[validate(custom(function = ...))]`.

use validator::ValidationError;

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LENGTH: usize = 10;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "Value cannot be blank"))
    } else {
        Ok(())
    }
}

/// Requires a minimum length plus at least one letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(error(
            "password_length",
            "Password must be at least 10 characters",
        ));
    }
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(error(
            "password_complexity",
            "Password must contain letters and digits",
        ));
    }
    Ok(())
}

/// Scan links must be served over HTTPS.
pub fn validate_https_url(url: &str) -> Result<(), ValidationError> {
    match url.strip_prefix("https://") {
        Some(rest) if !rest.is_empty() && !rest.contains(char::is_whitespace) => Ok(()),
        _ => Err(error("https_url", "URL must be an https:// link")),
    }
}
