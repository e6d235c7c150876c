use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document row. Deleted rows are kept for the version history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub meeting_item_id: i64,
    pub original_file_name: String,
    pub stored_file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub content_type: String,
    pub version: i32,
    pub base_document_id: Option<i64>,
    pub is_latest_version: bool,
    #[serde(skip)]
    pub is_deleted: bool,
    #[serde(skip)]
    pub deleted_by: Option<String>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Id shared by every version of this document's chain.
    pub fn chain_root(&self) -> i64 {
        self.base_document_id.unwrap_or(self.id)
    }
}

/// Document returned from create, update and upload calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: i64,
    pub file_name: String,
    pub original_file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub version: i32,
    pub base_document_id: Option<i64>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        DocumentSummary {
            id: doc.id,
            file_name: doc.stored_file_name.clone(),
            original_file_name: doc.original_file_name.clone(),
            file_size: doc.file_size,
            content_type: doc.content_type.clone(),
            version: doc.version,
            base_document_id: doc.base_document_id,
        }
    }
}

/// A file attached to a request as base64.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    /// Declared size; checked against the decoded length when present.
    #[serde(default)]
    pub file_size: Option<i64>,
    pub base64_content: String,
    /// Makes the upload the next version of this document's chain.
    #[serde(default)]
    pub base_document_id: Option<i64>,
}

/// A new version of an existing document, sent with an item update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersionUpload {
    pub base_document_id: i64,
    pub document: DocumentUpload,
}

/// An upload that passed validation, with its decoded bytes.
#[derive(Debug, Clone)]
pub struct ValidUpload {
    pub original_file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub meeting_item_id: i64,
    pub original_file_name: &'a str,
    pub stored_file_name: &'a str,
    pub storage_path: &'a str,
    pub file_size: i64,
    pub content_type: &'a str,
    pub version: i32,
    pub base_document_id: Option<i64>,
    pub uploaded_by: &'a str,
}
