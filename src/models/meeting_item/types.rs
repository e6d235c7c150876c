use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::document::{Document, DocumentSummary, DocumentUpload, DocumentVersionUpload};
use crate::models::template::{FieldType, FieldValueInput, TypedValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Decision,
    Discussion,
    Information,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Decision => "Decision",
            Outcome::Discussion => "Discussion",
            Outcome::Information => "Information",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Decision" => Ok(Outcome::Decision),
            "Discussion" => Ok(Outcome::Discussion),
            "Information" => Ok(Outcome::Information),
            other => Err(format!("Unknown outcome '{other}'")),
        }
    }
}

/// Workflow state of a meeting item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Draft,
    Submitted,
    Proposed,
    Planned,
    Discussed,
    Denied,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 6] = [
        ItemStatus::Draft,
        ItemStatus::Submitted,
        ItemStatus::Proposed,
        ItemStatus::Planned,
        ItemStatus::Discussed,
        ItemStatus::Denied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "Draft",
            ItemStatus::Submitted => "Submitted",
            ItemStatus::Proposed => "Proposed",
            ItemStatus::Planned => "Planned",
            ItemStatus::Discussed => "Discussed",
            ItemStatus::Denied => "Denied",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown status '{}'", s.trim()))
    }
}

fn decode<T: FromStr<Err = String>>(value: &str) -> Result<T, AppError> {
    value
        .parse::<T>()
        .map_err(|e| AppError::Db(sqlx::Error::Decode(e.into())))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetingItemRow {
    pub id: i64,
    pub decision_board_id: i64,
    pub template_id: Option<i64>,
    pub topic: String,
    pub purpose: String,
    pub outcome: String,
    pub duration_minutes: i32,
    pub digital_product: String,
    pub requestor: String,
    pub owner_presenter: String,
    pub sponsor: Option<String>,
    pub status: String,
    pub denial_reason: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingItem {
    pub id: i64,
    pub decision_board_id: i64,
    pub template_id: Option<i64>,
    pub topic: String,
    pub purpose: String,
    pub outcome: Outcome,
    #[serde(rename = "duration")]
    pub duration_minutes: i32,
    pub digital_product: String,
    pub requestor: String,
    pub owner_presenter: String,
    pub sponsor: Option<String>,
    pub status: ItemStatus,
    pub denial_reason: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<MeetingItemRow> for MeetingItem {
    type Error = AppError;

    fn try_from(row: MeetingItemRow) -> Result<Self, Self::Error> {
        Ok(MeetingItem {
            id: row.id,
            decision_board_id: row.decision_board_id,
            template_id: row.template_id,
            topic: row.topic,
            purpose: row.purpose,
            outcome: decode(&row.outcome)?,
            duration_minutes: row.duration_minutes,
            digital_product: row.digital_product,
            requestor: row.requestor,
            owner_presenter: row.owner_presenter,
            sponsor: row.sponsor,
            status: decode(&row.status)?,
            denial_reason: row.denial_reason,
            submission_date: row.submission_date,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

impl MeetingItem {
    /// The requestor and the owner/presenter both count as owners.
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.requestor.eq_ignore_ascii_case(username) || self.owner_presenter.eq_ignore_ascii_case(username)
    }

    /// Items can be edited until they reach a terminal status.
    pub fn is_editable(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetingItemListRow {
    #[sqlx(flatten)]
    pub item: MeetingItemRow,
    pub decision_board_name: String,
    pub document_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingItemListItem {
    #[serde(flatten)]
    pub item: MeetingItem,
    pub decision_board_name: String,
    pub document_count: i64,
}

impl TryFrom<MeetingItemListRow> for MeetingItemListItem {
    type Error = AppError;

    fn try_from(row: MeetingItemListRow) -> Result<Self, Self::Error> {
        Ok(MeetingItemListItem {
            item: row.item.try_into()?,
            decision_board_name: row.decision_board_name,
            document_count: row.document_count,
        })
    }
}

/// Filters for the paginated item list.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub decision_board_id: Option<i64>,
    pub status: Option<ItemStatus>,
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A stored field value joined with its definition.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FieldValueRow {
    pub field_definition_id: i64,
    pub field_name: String,
    pub label: String,
    pub field_type: String,
    pub category: String,
    pub display_order: i32,
    pub is_active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
    #[sqlx(flatten)]
    pub value: TypedValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFieldValue {
    pub field_definition_id: i64,
    pub field_name: String,
    pub label: String,
    pub field_type: FieldType,
    pub category: String,
    pub display_order: i32,
    #[serde(flatten)]
    pub value: TypedValue,
}

/// Value of a field that has since been deactivated, rendered for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalFieldValue {
    pub field_definition_id: i64,
    pub field_name: String,
    pub label: String,
    pub field_type: FieldType,
    pub display_value: String,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
}

/// Split stored values into active and historical fields.
pub fn split_field_values(
    rows: Vec<FieldValueRow>,
) -> Result<(Vec<ActiveFieldValue>, Vec<HistoricalFieldValue>), AppError> {
    let mut active = Vec::new();
    let mut historical = Vec::new();

    for row in rows {
        let field_type: FieldType = decode(&row.field_type)?;
        if row.is_active {
            active.push(ActiveFieldValue {
                field_definition_id: row.field_definition_id,
                field_name: row.field_name,
                label: row.label,
                field_type,
                category: row.category,
                display_order: row.display_order,
                value: row.value,
            });
        } else {
            historical.push(HistoricalFieldValue {
                field_definition_id: row.field_definition_id,
                field_name: row.field_name,
                label: row.label,
                field_type,
                display_value: row.value.display(field_type),
                deactivated_at: row.deactivated_at,
                deactivation_reason: row.deactivation_reason,
            });
        }
    }

    active.sort_by(|a, b| a.category.cmp(&b.category).then(a.display_order.cmp(&b.display_order)));
    Ok((active, historical))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingItemDetail {
    #[serde(flatten)]
    pub item: MeetingItem,
    pub decision_board_name: String,
    pub template_name: Option<String>,
    pub active_fields: Vec<ActiveFieldValue>,
    pub historical_fields: Vec<HistoricalFieldValue>,
    pub documents: Vec<Document>,
    pub available_transitions: Vec<ItemStatus>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub meeting_item_id: i64,
    pub from_status: String,
    pub to_status: String,
    pub comment: Option<String>,
    pub denial_reason: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Static fields shared by create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub digital_product: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub owner_presenter: String,
    #[serde(default)]
    pub sponsor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingItemRequest {
    pub decision_board_id: i64,
    #[serde(default)]
    pub template_id: Option<i64>,
    #[serde(flatten)]
    pub fields: ItemFields,
    #[serde(default)]
    pub field_values: Vec<FieldValueInput>,
    #[serde(default)]
    pub documents: Vec<DocumentUpload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingItemRequest {
    /// When present it must match the id in the route.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: ItemFields,
    #[serde(default)]
    pub field_values: Vec<FieldValueInput>,
    #[serde(default)]
    pub new_documents: Vec<DocumentUpload>,
    #[serde(default)]
    pub document_versions: Vec<DocumentVersionUpload>,
    #[serde(default)]
    pub documents_to_delete: Vec<i64>,
}

/// Validated static fields, ready to persist.
#[derive(Debug, Clone)]
pub struct ValidItemFields {
    pub topic: String,
    pub purpose: String,
    pub outcome: Outcome,
    pub digital_product: String,
    pub duration_minutes: i32,
    pub owner_presenter: String,
    pub sponsor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub denial_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResult {
    pub meeting_item_id: i64,
    pub previous_status: ItemStatus,
    pub new_status: ItemStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingItemResponse {
    pub id: i64,
    pub status: ItemStatus,
    pub template_id: Option<i64>,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingItemResponse {
    pub meeting_item_id: i64,
    pub newly_uploaded_documents: Vec<DocumentSummary>,
    pub versioned_documents: Vec<DocumentSummary>,
    pub deleted_document_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, active: bool, order: i32, value: TypedValue) -> FieldValueRow {
        FieldValueRow {
            field_definition_id: order as i64,
            field_name: name.to_string(),
            label: name.to_uppercase(),
            field_type: if value.boolean_value.is_some() { "YesNo" } else { "Text" }.to_string(),
            category: "General".to_string(),
            display_order: order,
            is_active: active,
            deactivated_at: None,
            deactivation_reason: (!active).then(|| "Replaced".to_string()),
            value,
        }
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!("submitted".parse::<ItemStatus>().unwrap(), ItemStatus::Submitted);
        assert_eq!(" Denied ".parse::<ItemStatus>().unwrap(), ItemStatus::Denied);
        assert!("Approved".parse::<ItemStatus>().is_err());
        assert!("Memo".parse::<Outcome>().is_err());
    }

    #[test]
    fn deactivated_values_become_historical() {
        let rows = vec![
            row("second", true, 2, TypedValue { text_value: Some("b".into()), ..Default::default() }),
            row("retired", false, 3, TypedValue { boolean_value: Some(false), ..Default::default() }),
            row("first", true, 1, TypedValue { text_value: Some("a".into()), ..Default::default() }),
        ];
        let (active, historical) = split_field_values(rows).unwrap();
        let names: Vec<&str> = active.iter().map(|a| a.field_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(historical.len(), 1);
        assert_eq!(historical[0].display_value, "No");
        assert_eq!(historical[0].deactivation_reason.as_deref(), Some("Replaced"));
    }

    #[test]
    fn create_request_reads_camel_case() {
        let req: CreateMeetingItemRequest = serde_json::from_value(serde_json::json!({
            "decisionBoardId": 3,
            "topic": "Budget",
            "purpose": "Approve the yearly budget",
            "outcome": "Decision",
            "digitalProduct": "Finance portal",
            "duration": 30,
            "ownerPresenter": "alice",
            "fieldValues": [{"fieldName": "costCenter", "textValue": "CC-1"}]
        }))
        .unwrap();
        assert_eq!(req.decision_board_id, 3);
        assert_eq!(req.fields.duration, 30);
        assert_eq!(req.field_values[0].value.text_value.as_deref(), Some("CC-1"));
        assert!(req.documents.is_empty());
    }
}
