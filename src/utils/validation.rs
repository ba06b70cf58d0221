use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{Error, Result};

pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate()?;
    Ok(())
}

/// Validation failure on a single field, for checks the derive can't express.
pub fn invalid(field: &'static str, message: impl Into<String>) -> Error {
    let mut error = ValidationError::new("invalid");
    error.message = Some(Cow::Owned(message.into()));
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    Error::Validation(errors)
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn require_not_blank(field: &'static str, value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, message));
    }
    Ok(())
}
