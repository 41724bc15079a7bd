//! 登录凭据

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::security::validation::{
    Sanitizable, Validatable, ValidationResult, sanitize_string, validate_max_length,
    validate_no_control_chars, validate_required,
};

const MAX_FIELD_LENGTH: usize = 128;

/// 门户登录凭据
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Credentials {
    /// 学号
    pub student_id: String,
    /// 密码
    pub password: String,
}

impl Credentials {
    pub fn new(student_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("student_id", &self.student_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validatable for Credentials {
    fn validate(&self) -> ValidationResult<()> {
        validate_required("student_id", &self.student_id)?;
        validate_required("password", &self.password)?;
        validate_max_length("student_id", &self.student_id, MAX_FIELD_LENGTH)?;
        validate_max_length("password", &self.password, MAX_FIELD_LENGTH)?;
        validate_no_control_chars("student_id", &self.student_id)?;
        validate_no_control_chars("password", &self.password)
    }
}

impl Sanitizable for Credentials {
    // Passwords may legitimately carry surrounding spaces.
    fn sanitize(&mut self) {
        self.student_id = sanitize_string(&self.student_id);
    }
}
