//! Security Module
//!
//! Input validation for credentials submitted to the portal.

pub mod validation;

pub use validation::{Sanitizable, Validatable, ValidationError, ValidationResult};
