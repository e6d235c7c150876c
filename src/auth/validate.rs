use crate::errors::MSG_REQUIRED;
use crate::responses::FieldError;

/// Validate a required text field with a max length (in characters).
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(MSG_REQUIRED.to_string());
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must not exceed {max_len} characters"));
    }
    None
}

/// Validate a required text field that must also meet a minimum length.
pub fn validate_length_range(value: &str, field_name: &str, min_len: usize, max_len: usize) -> Option<String> {
    if let Some(msg) = validate_required(value, field_name, max_len) {
        return Some(msg);
    }
    if value.trim().chars().count() < min_len {
        return Some(format!("{field_name} must be at least {min_len} characters"));
    }
    None
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: Option<&str>, field_name: &str, max_len: usize) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if v.chars().count() > max_len => {
            Some(format!("{field_name} must not exceed {max_len} characters"))
        }
        _ => None,
    }
}

/// Validate an integer against an inclusive range.
pub fn validate_range(value: i64, field_name: &str, min: i64, max: i64, unit: &str) -> Option<String> {
    if value < min {
        if min == 1 {
            return Some(format!("{field_name} must be greater than 0"));
        }
        return Some(format!("{field_name} must be at least {min} {unit}").trim_end().to_string());
    }
    if value > max {
        return Some(format!("{field_name} must not exceed {max} {unit}").trim_end().to_string());
    }
    None
}

/// Push a field error when a validator produced a message.
pub fn collect(errors: &mut Vec<FieldError>, field: &str, result: Option<String>) {
    if let Some(message) = result {
        errors.push(FieldError::new(field, message));
    }
}
