//! Validation of dynamic field values against a template's definitions.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

use super::types::{FieldDefinition, FieldType, NewFieldDefinition, TypedValue, ValidationRules};
use crate::auth::validate::{collect, validate_optional, validate_required};
use crate::responses::FieldError;

/// One dynamic field value in a create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValueInput {
    pub field_name: String,
    #[serde(flatten)]
    pub value: TypedValue,
}

impl FieldValueInput {
    pub fn text(field_name: &str, value: &str) -> Self {
        FieldValueInput {
            field_name: field_name.to_string(),
            value: TypedValue { text_value: Some(value.to_string()), ..Default::default() },
        }
    }
}

impl TypedValue {
    /// Selected values of a multi-select field. Accepts a JSON array or a
    /// string holding one; `None` when the payload is not a string array.
    pub fn multi_values(&self) -> Option<Vec<String>> {
        let json = self.json_value.as_ref()?;
        let parsed;
        let array = match json {
            serde_json::Value::String(s) => {
                parsed = serde_json::from_str::<serde_json::Value>(s).ok()?;
                parsed.as_array()?
            }
            other => other.as_array()?,
        };
        array.iter().map(|v| v.as_str().map(str::to_string)).collect()
    }

    /// Whether the column matching `field_type` carries a usable value.
    pub fn is_filled(&self, field_type: FieldType) -> bool {
        match field_type {
            FieldType::Text | FieldType::TextArea | FieldType::Email | FieldType::Dropdown => self
                .text_value
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty()),
            FieldType::Number => self.number_value.is_some(),
            FieldType::Date => self.date_value.is_some(),
            FieldType::Boolean => self.boolean_value.is_some(),
            FieldType::MultiSelect => self.multi_values().is_some_and(|v| !v.is_empty()),
        }
    }

    /// Keep only the column that belongs to `field_type`.
    pub fn normalized(&self, field_type: FieldType) -> TypedValue {
        match field_type {
            FieldType::Text | FieldType::TextArea | FieldType::Email | FieldType::Dropdown => TypedValue {
                text_value: self.text_value.as_ref().map(|s| s.trim().to_string()),
                ..Default::default()
            },
            FieldType::Number => TypedValue { number_value: self.number_value, ..Default::default() },
            FieldType::Date => TypedValue { date_value: self.date_value, ..Default::default() },
            FieldType::Boolean => TypedValue { boolean_value: self.boolean_value, ..Default::default() },
            FieldType::MultiSelect => TypedValue {
                json_value: self.multi_values().map(serde_json::Value::from),
                ..Default::default()
            },
        }
    }

    /// Human-readable rendering, used for historical (deactivated) fields.
    pub fn display(&self, field_type: FieldType) -> String {
        match field_type {
            FieldType::Number => self.number_value.map(|n| n.to_string()).unwrap_or_default(),
            FieldType::Date => self.date_value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            FieldType::Boolean => match self.boolean_value {
                Some(true) => "Yes".to_string(),
                Some(false) => "No".to_string(),
                None => String::new(),
            },
            FieldType::MultiSelect => self.multi_values().map(|v| v.join(", ")).unwrap_or_default(),
            _ => self.text_value.clone().unwrap_or_default(),
        }
    }
}

fn field_key(name: &str) -> String {
    format!("fields.{name}")
}

/// Check submitted values against the template's field definitions.
///
/// Unknown fields, values for deactivated fields, duplicate entries and
/// type or rule violations are all reported. Missing required fields are
/// left to [`missing_required`], since updates merge with stored values.
pub fn validate_field_values(definitions: &[FieldDefinition], values: &[FieldValueInput]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for input in values {
        let key = field_key(&input.field_name);
        if !seen.insert(input.field_name.as_str()) {
            errors.push(FieldError::new(&key, "Field was supplied more than once"));
            continue;
        }
        let Some(def) = definitions.iter().find(|d| d.field_name == input.field_name) else {
            errors.push(FieldError::new(&key, format!("Unknown field '{}'", input.field_name)));
            continue;
        };
        if !def.is_active {
            errors.push(FieldError::new(&key, format!("{} is no longer active", def.label)));
            continue;
        }
        // Blank optional values are simply cleared
        if !input.value.is_filled(def.field_type) {
            if def.field_type == FieldType::MultiSelect && input.value.json_value.is_some()
                && input.value.multi_values().is_none()
            {
                errors.push(FieldError::new(&key, format!("{} must be a list of values", def.label)));
            }
            continue;
        }
        collect(&mut errors, &key, check_value(def, &input.value));
    }

    errors
}

/// Labels of required active fields for which `is_filled` reports no value.
pub fn missing_required<'a, F>(definitions: &'a [FieldDefinition], is_filled: F) -> Vec<&'a FieldDefinition>
where
    F: Fn(&FieldDefinition) -> bool,
{
    definitions
        .iter()
        .filter(|d| d.is_active && d.is_required && !is_filled(d))
        .collect()
}

/// Field errors for every missing required field.
pub fn required_errors(missing: &[&FieldDefinition]) -> Vec<FieldError> {
    missing
        .iter()
        .map(|d| FieldError::new(&field_key(&d.field_name), format!("{} is required", d.label)))
        .collect()
}

fn check_value(def: &FieldDefinition, value: &TypedValue) -> Option<String> {
    let rules = def.validation_rules.clone().unwrap_or_default();
    let label = def.label.as_str();

    match def.field_type {
        FieldType::Text | FieldType::TextArea => {
            let text = value.text_value.as_deref().unwrap_or_default().trim();
            check_text_rules(label, text, &rules)
        }
        FieldType::Email => {
            let text = value.text_value.as_deref().unwrap_or_default().trim();
            if !is_valid_email(text) {
                return Some(format!("{label} must be a valid email address"));
            }
            check_text_rules(label, text, &rules)
        }
        FieldType::Number => {
            let n = value.number_value?;
            if !n.is_finite() {
                return Some(format!("{label} must be a number"));
            }
            if let Some(min) = rules.min
                && n < min
            {
                return Some(format!("{label} must be at least {min}"));
            }
            if let Some(max) = rules.max
                && n > max
            {
                return Some(format!("{label} must not exceed {max}"));
            }
            None
        }
        FieldType::Date | FieldType::Boolean => None,
        FieldType::Dropdown => {
            let text = value.text_value.as_deref().unwrap_or_default().trim();
            if def.active_option_values().contains(&text) {
                None
            } else {
                Some(format!("'{text}' is not a valid option for {label}"))
            }
        }
        FieldType::MultiSelect => {
            let Some(selected) = value.multi_values() else {
                return Some(format!("{label} must be a list of values"));
            };
            let allowed = def.active_option_values();
            selected
                .iter()
                .find(|v| !allowed.contains(&v.as_str()))
                .map(|bad| format!("'{bad}' is not a valid option for {label}"))
        }
    }
}

fn check_text_rules(label: &str, text: &str, rules: &ValidationRules) -> Option<String> {
    let len = text.chars().count();
    if let Some(min) = rules.min_length
        && len < min
    {
        return Some(format!("{label} must be at least {min} characters"));
    }
    if let Some(max) = rules.max_length
        && len > max
    {
        return Some(format!("{label} must not exceed {max} characters"));
    }
    if let Some(pattern) = rules.pattern.as_deref() {
        let matches = Regex::new(pattern).map(|re| re.is_match(text)).unwrap_or(false);
        if !matches {
            return Some(
                rules
                    .pattern_message
                    .clone()
                    .unwrap_or_else(|| format!("{label} has an invalid format")),
            );
        }
    }
    None
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Validate a field definition before it is added to a template.
pub fn validate_new_field(field: &NewFieldDefinition) -> Vec<FieldError> {
    let mut errors = Vec::new();

    collect(&mut errors, "fieldName", validate_required(&field.field_name, "Field name", 100));
    let name_ok = field
        .field_name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && field.field_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !field.field_name.trim().is_empty() && !name_ok {
        errors.push(FieldError::new(
            "fieldName",
            "Field name must start with a letter and contain only letters, digits and underscores",
        ));
    }
    collect(&mut errors, "label", validate_required(&field.label, "Label", 200));
    collect(&mut errors, "category", validate_optional(field.category.as_deref(), "Category", 100));
    collect(&mut errors, "helpText", validate_optional(field.help_text.as_deref(), "Help text", 500));

    if field.field_type.uses_options() {
        if field.options.is_empty() {
            errors.push(FieldError::new("options", format!("{} fields need at least one option", field.field_type)));
        }
        let mut values = HashSet::new();
        for option in &field.options {
            if option.value.trim().is_empty() || option.label.trim().is_empty() {
                errors.push(FieldError::new("options", "Options need both a value and a label"));
            } else if !values.insert(option.value.trim()) {
                errors.push(FieldError::new("options", format!("Duplicate option value '{}'", option.value)));
            }
        }
    }

    if let Some(rules) = &field.validation_rules {
        if let (Some(min), Some(max)) = (rules.min_length, rules.max_length)
            && min > max
        {
            errors.push(FieldError::new("validationRules", "minLength must not exceed maxLength"));
        }
        if let (Some(min), Some(max)) = (rules.min, rules.max)
            && min > max
        {
            errors.push(FieldError::new("validationRules", "min must not exceed max"));
        }
        if let Some(pattern) = &rules.pattern
            && Regex::new(pattern).is_err()
        {
            errors.push(FieldError::new("validationRules", "pattern is not a valid regular expression"));
        }
    }

    errors
}
