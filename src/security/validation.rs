//! Request Validation Module
//!
//! Validation and sanitization of user-supplied input before it reaches the portal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Field '{field}' is too long (max: {max}, got: {got})")]
    TooLong {
        field: String,
        max: usize,
        got: usize,
    },

    #[error("Field '{field}' contains invalid characters: {chars}")]
    InvalidCharacters { field: String, chars: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field } => field.as_str(),
            Self::TooLong { field, .. } => field.as_str(),
            Self::InvalidCharacters { field, .. } => field.as_str(),
        }
    }
}

/// Validation result type
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Input validation trait
pub trait Validatable {
    /// Validate the input data
    fn validate(&self) -> ValidationResult<()>;
}

/// Input sanitizer trait
pub trait Sanitizable {
    /// Sanitize the input data
    fn sanitize(&mut self);
}

/// Require a non-empty value
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validate field length
pub fn validate_max_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let length = value.chars().count();
    if length > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            got: length,
        });
    }
    Ok(())
}

/// Reject control characters
pub fn validate_no_control_chars(field: &str, value: &str) -> ValidationResult<()> {
    let invalid: String = value.chars().filter(|c| c.is_control()).collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
            chars: invalid.escape_default().to_string(),
        });
    }
    Ok(())
}

/// Sanitize string input
pub fn sanitize_string(input: &str) -> String {
    // Remove null bytes and control characters
    input
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect()
}
