use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of dynamic field a template can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    TextArea,
    Email,
    Number,
    Date,
    #[serde(alias = "YesNo")]
    Boolean,
    #[serde(alias = "Radio")]
    Dropdown,
    MultiSelect,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::TextArea => "TextArea",
            FieldType::Email => "Email",
            FieldType::Number => "Number",
            FieldType::Date => "Date",
            FieldType::Boolean => "Boolean",
            FieldType::Dropdown => "Dropdown",
            FieldType::MultiSelect => "MultiSelect",
        }
    }

    /// Dropdown and multi-select fields draw their values from an option list.
    pub fn uses_options(&self) -> bool {
        matches!(self, FieldType::Dropdown | FieldType::MultiSelect)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Text" => Ok(FieldType::Text),
            "TextArea" => Ok(FieldType::TextArea),
            "Email" => Ok(FieldType::Email),
            "Number" => Ok(FieldType::Number),
            "Date" => Ok(FieldType::Date),
            "Boolean" | "YesNo" => Ok(FieldType::Boolean),
            "Dropdown" | "Radio" => Ok(FieldType::Dropdown),
            "MultiSelect" => Ok(FieldType::MultiSelect),
            other => Err(format!("Unknown field type '{other}'")),
        }
    }
}

/// Per-field validation rules, stored as JSON on the definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        *self == ValidationRules::default()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub id: i64,
    #[serde(skip)]
    pub field_definition_id: i64,
    pub value: String,
    pub label: String,
    pub display_order: i32,
    pub is_default: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: i64,
    pub template_id: i64,
    pub field_name: String,
    pub label: String,
    pub field_type: FieldType,
    pub is_required: bool,
    pub category: String,
    pub display_order: i32,
    pub help_text: Option<String>,
    pub placeholder_text: Option<String>,
    pub validation_rules: Option<ValidationRules>,
    pub is_active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
    pub options: Vec<FieldOption>,
}

impl FieldDefinition {
    /// Values of the options currently offered to users.
    pub fn active_option_values(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| o.is_active)
            .map(|o| o.value.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: i64,
    pub decision_board_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A template with every field definition (active and deactivated).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithFields {
    #[serde(flatten)]
    pub template: Template,
    pub fields: Vec<FieldDefinition>,
}

impl TemplateWithFields {
    /// Form view: active fields in display order, each with only its active options.
    pub fn active_only(self) -> TemplateWithFields {
        let mut fields: Vec<FieldDefinition> = self
            .fields
            .into_iter()
            .filter(|f| f.is_active)
            .map(|mut f| {
                f.options.retain(|o| o.is_active);
                f.options.sort_by_key(|o| o.display_order);
                f
            })
            .collect();
        fields.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.display_order.cmp(&b.display_order))
        });
        TemplateWithFields { template: self.template, fields }
    }
}

/// Typed value columns shared by request bodies and stored field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    #[serde(default)]
    pub text_value: Option<String>,
    #[serde(default)]
    pub number_value: Option<f64>,
    #[serde(default)]
    pub date_value: Option<NaiveDate>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
    #[serde(default)]
    pub json_value: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub make_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFieldOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFieldDefinition {
    pub field_name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub placeholder_text: Option<String>,
    #[serde(default)]
    pub validation_rules: Option<ValidationRules>,
    #[serde(default)]
    pub options: Vec<NewFieldOption>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateFieldRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_aliases() {
        assert_eq!("YesNo".parse::<FieldType>().unwrap(), FieldType::Boolean);
        assert_eq!("Radio".parse::<FieldType>().unwrap(), FieldType::Dropdown);
        assert!("Slider".parse::<FieldType>().is_err());

        let ft: FieldType = serde_json::from_str("\"YesNo\"").unwrap();
        assert_eq!(ft, FieldType::Boolean);
        assert_eq!(serde_json::to_string(&FieldType::MultiSelect).unwrap(), "\"MultiSelect\"");
    }

    #[test]
    fn rules_parse_camel_case() {
        let rules: ValidationRules =
            serde_json::from_str(r#"{"minLength": 2, "maxLength": 10, "pattern": "^[A-Z]"}"#).unwrap();
        assert_eq!(rules.min_length, Some(2));
        assert_eq!(rules.max_length, Some(10));
        assert_eq!(rules.pattern.as_deref(), Some("^[A-Z]"));
        assert!(!rules.is_empty());
        assert!(ValidationRules::default().is_empty());
    }

    fn definition(id: i64, name: &str, category: &str, order: i32, active: bool) -> FieldDefinition {
        FieldDefinition {
            id,
            template_id: 1,
            field_name: name.to_string(),
            label: name.to_string(),
            field_type: FieldType::Dropdown,
            is_required: false,
            category: category.to_string(),
            display_order: order,
            help_text: None,
            placeholder_text: None,
            validation_rules: None,
            is_active: active,
            deactivated_at: None,
            deactivation_reason: None,
            options: vec![
                FieldOption {
                    id: id * 10 + 2,
                    field_definition_id: id,
                    value: "b".into(),
                    label: "B".into(),
                    display_order: 2,
                    is_default: false,
                    is_active: true,
                },
                FieldOption {
                    id: id * 10 + 1,
                    field_definition_id: id,
                    value: "old".into(),
                    label: "Old".into(),
                    display_order: 1,
                    is_default: false,
                    is_active: false,
                },
            ],
        }
    }

    #[test]
    fn active_only_drops_inactive_and_orders() {
        let template = TemplateWithFields {
            template: Template {
                id: 1,
                decision_board_id: 1,
                name: "Standard".into(),
                description: None,
                is_active: true,
                created_by: "admin".into(),
                created_at: Utc::now(),
            },
            fields: vec![
                definition(1, "risk", "Risk", 1, true),
                definition(2, "retired", "General", 1, false),
                definition(3, "budget", "General", 2, true),
                definition(4, "owner", "General", 1, true),
            ],
        };

        let form = template.active_only();
        let names: Vec<&str> = form.fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["owner", "budget", "risk"]);
        assert!(form.fields.iter().all(|f| f.active_option_values() == vec!["b"]));
        assert!(form.fields.iter().all(|f| f.options.len() == 1));
    }
}
