//! Synchronous validation rules.
//!
//! Nothing here does I/O; whether a username is free is decided by
//! [`ValidationService`](crate::ValidationService) after
//! [`validate_username`] asks for a remote check.

use crate::api::ApiError;
use crate::config::ValidationConfig;

pub const USERNAME_CHARSET: &str = "Username can only contain numbers or digits";
pub const USERNAME_AVAILABLE: &str = "Username available";
pub const USERNAME_TAKEN: &str = "Username already taken";
pub const SERVER_UNREACHABLE: &str = "Error contacting server";
pub const PASSWORD_ACCEPTABLE: &str = "Password acceptable";
pub const PASSWORD_REPEATED: &str = "Password repeated";
pub const PASSWORD_DIFFERENT: &str = "Password different";

/// State of one form field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValidationResult {
    #[default]
    Empty,
    Validating,
    Failed(String),
    Ok(String),
}

impl ValidationResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::Ok(message.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_validating(&self) -> bool {
        matches!(self, Self::Validating)
    }

    /// Text to show next to the field, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed(m) | Self::Ok(m) => Some(m),
            Self::Empty | Self::Validating => None,
        }
    }
}

/// Outcome of the local part of username validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsernameCheck {
    /// Decided locally; either `Empty` or `Failed`.
    Settled(ValidationResult),
    NeedsRemoteCheck,
}

pub fn validate_username(config: &ValidationConfig, name: &str) -> UsernameCheck {
    if name.trim().is_empty() {
        return UsernameCheck::Settled(ValidationResult::Empty);
    }
    if name.chars().count() < config.min_username_length {
        return UsernameCheck::Settled(ValidationResult::Failed(format!(
            "Username must be at least {} characters",
            config.min_username_length
        )));
    }
    if !name.chars().all(char::is_alphanumeric) {
        return UsernameCheck::Settled(ValidationResult::failed(USERNAME_CHARSET));
    }
    UsernameCheck::NeedsRemoteCheck
}

pub fn validate_password(config: &ValidationConfig, password: &str) -> ValidationResult {
    if password.is_empty() {
        return ValidationResult::Empty;
    }
    if password.chars().count() < config.min_password_length {
        return ValidationResult::Failed(format!(
            "Password must be at least {} characters",
            config.min_password_length
        ));
    }
    ValidationResult::ok(PASSWORD_ACCEPTABLE)
}

pub fn validate_repeated_password(password: &str, repeated: &str) -> ValidationResult {
    if repeated.is_empty() {
        ValidationResult::Empty
    } else if repeated == password {
        ValidationResult::ok(PASSWORD_REPEATED)
    } else {
        ValidationResult::failed(PASSWORD_DIFFERENT)
    }
}

/// Maps the answer of a remote availability check to a field state.
pub fn username_availability(answer: &Result<bool, ApiError>) -> ValidationResult {
    match answer {
        Ok(true) => ValidationResult::ok(USERNAME_AVAILABLE),
        Ok(false) => ValidationResult::failed(USERNAME_TAKEN),
        Err(_) => ValidationResult::failed(SERVER_UNREACHABLE),
    }
}
