//! Bridge from `validator` derive output to [`CoreError::Validation`].

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;

/// Run `validator` rules on `input`, mapping failures to a readable message.
pub fn validate<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(describe(&errors)))
}

/// Flatten validation errors into `field: reason` pairs, sorted by field name.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .errors()
        .iter()
        .map(|(field, kind)| match kind {
            ValidationErrorsKind::Field(list) => {
                let reason = list
                    .first()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .unwrap_or_else(|| "invalid".to_string());
                format!("{field}: {reason}")
            }
            ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => {
                format!("{field}: invalid")
            }
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
