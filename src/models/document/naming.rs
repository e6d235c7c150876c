//! Upload validation and stored file naming.

use actix_web::http::header::HeaderValue;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::Path;

use super::types::{DocumentUpload, ValidUpload};
use crate::auth::validate::{collect, validate_required};
use crate::responses::FieldError;
use crate::storage::CONTAINER;

pub const MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;
pub const MAX_FILE_NAME_LEN: usize = 255;
const MAX_STEM_LEN: usize = 50;
const MAX_ABBREVIATION_LEN: usize = 10;

/// Decode base64 content, tolerating a `data:<type>;base64,` prefix.
pub fn decode_base64(content: &str) -> Result<Vec<u8>, String> {
    let trimmed = content.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| "Data URL has no content".to_string())?,
        None => trimmed,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("Invalid base64 content: {e}"))
}

/// Validate an upload and decode its bytes. Error fields are prefixed with `prefix`.
pub fn validate_upload(upload: &DocumentUpload, prefix: &str) -> Result<ValidUpload, Vec<FieldError>> {
    let mut errors = Vec::new();
    let key = |name: &str| format!("{prefix}.{name}");

    collect(&mut errors, &key("fileName"), validate_required(&upload.file_name, "File name", MAX_FILE_NAME_LEN));
    collect(&mut errors, &key("contentType"), validate_required(&upload.content_type, "Content type", 255));
    let content_type = upload.content_type.trim();
    if !content_type.is_empty() && !is_valid_content_type(content_type) {
        errors.push(FieldError::new(key("contentType"), "Content type must be a media type such as application/pdf"));
    }

    if let Some(size) = upload.file_size {
        if size <= 0 {
            errors.push(FieldError::new(key("fileSize"), "File size must be greater than 0"));
        } else if size > MAX_FILE_SIZE {
            errors.push(FieldError::new(key("fileSize"), "File size must not exceed 10 MB"));
        }
    }

    let bytes = if upload.base64_content.trim().is_empty() {
        errors.push(FieldError::new(key("base64Content"), "File content is required"));
        None
    } else {
        match decode_base64(&upload.base64_content) {
            Ok(bytes) => Some(bytes),
            Err(msg) => {
                errors.push(FieldError::new(key("base64Content"), msg));
                None
            }
        }
    };

    if let Some(bytes) = &bytes {
        let len = bytes.len() as i64;
        if len == 0 {
            errors.push(FieldError::new(key("fileSize"), "File size must be greater than 0"));
        } else if len > MAX_FILE_SIZE {
            errors.push(FieldError::new(key("fileSize"), "File size must not exceed 10 MB"));
        } else if upload.file_size.is_some_and(|declared| declared > 0 && declared != len) {
            errors.push(FieldError::new(key("fileSize"), "File size does not match the uploaded content"));
        }
    }

    match bytes {
        Some(bytes) if errors.is_empty() => Ok(ValidUpload {
            original_file_name: upload.file_name.trim().to_string(),
            content_type: upload.content_type.trim().to_string(),
            bytes,
        }),
        _ => Err(errors),
    }
}

/// `type/subtype[;params]` that is also usable as a response header value.
fn is_valid_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    let well_formed = essence.split_once('/').is_some_and(|(kind, sub)| {
        !kind.is_empty() && !sub.is_empty() && !sub.contains('/') && !essence.contains(char::is_whitespace)
    });
    well_formed && HeaderValue::from_str(value).is_ok()
}

fn sanitize(value: &str, max_len: usize) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(max_len)
        .collect()
}

/// Strip characters that are unsafe in paths, replace spaces and cap the length.
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned = sanitize(stem, MAX_STEM_LEN);
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "document".to_string()
    } else {
        cleaned
    }
}

/// `{abbreviation}_{stem}_{yyyyMMddHHmmss}_{8 hex}{ext}`
///
/// The board abbreviation is dropped when nothing usable survives sanitizing.
pub fn generate_stored_name(abbreviation: &str, original: &str, now: DateTime<Utc>) -> String {
    // Only the last path component of a client-supplied name is used
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let path = Path::new(base);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(base);
    let ext: String = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let suffix = hex::encode(rand::rng().random::<[u8; 4]>());
    let prefix = match sanitize(abbreviation, MAX_ABBREVIATION_LEN) {
        abbr if abbr.is_empty() || abbr.chars().all(|c| c == '.') => String::new(),
        abbr => format!("{abbr}_"),
    };
    format!("{prefix}{}_{}_{suffix}{ext}", sanitize_stem(stem), now.format("%Y%m%d%H%M%S"))
}

pub fn storage_path(meeting_item_id: i64, stored_file_name: &str) -> String {
    format!("{CONTAINER}/{meeting_item_id}/{stored_file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn upload(name: &str, content: &str, size: Option<i64>) -> DocumentUpload {
        DocumentUpload {
            file_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            file_size: size,
            base64_content: content.to_string(),
            base_document_id: None,
        }
    }

    #[test]
    fn data_url_prefix_stripped() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64("data:text/plain;base64,aGVsbG8=").unwrap(), b"hello");
        assert!(decode_base64("not base64!!").is_err());
        assert!(decode_base64("data:text/plain;base64").is_err());
    }

    #[test]
    fn upload_checks_size_against_content() {
        let ok = validate_upload(&upload("a.pdf", "aGVsbG8=", Some(5)), "newDocuments[0]").unwrap();
        assert_eq!(ok.bytes, b"hello");

        let errs = validate_upload(&upload("a.pdf", "aGVsbG8=", Some(9)), "newDocuments[0]").unwrap_err();
        assert_eq!(errs[0].field, "newDocuments[0].fileSize");

        let errs = validate_upload(&upload("", "", None), "doc").unwrap_err();
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["doc.fileName", "doc.base64Content"]);
    }

    #[test]
    fn upload_over_limit_rejected() {
        let errs = validate_upload(&upload("big.bin", "aGVsbG8=", Some(MAX_FILE_SIZE + 1)), "doc").unwrap_err();
        assert!(errs.iter().any(|e| e.message.contains("10 MB")));
    }

    #[test]
    fn content_type_must_be_media_type() {
        let with_type = |ct: &str| DocumentUpload { content_type: ct.to_string(), ..upload("a.pdf", "aGVsbG8=", None) };
        assert!(validate_upload(&with_type("text/plain; charset=utf-8"), "doc").is_ok());

        for bad in ["pdf", "text/", "a/b/c", "text/plain\r\nX-Injected: 1", "appl ication/pdf"] {
            let errs = validate_upload(&with_type(bad), "doc").unwrap_err();
            assert_eq!(errs[0].field, "doc.contentType", "{bad:?}");
        }
    }

    #[test]
    fn stem_sanitized() {
        assert_eq!(sanitize_stem("Q3 budget: draft?"), "Q3_budget_draft");
        assert_eq!(sanitize_stem("***"), "document");
        assert_eq!(sanitize_stem(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn stored_name_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let name = generate_stored_name("ARB", "Board pack.PDF", now);
        assert!(name.starts_with("ARB_Board_pack_20260304050607_"), "{name}");
        assert!(name.ends_with(".PDF"));
        let suffix = &name["ARB_Board_pack_20260304050607_".len()..name.len() - 4];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

        assert!(generate_stored_name("ARB", "../../etc/passwd", now).starts_with("ARB_passwd_"));
        assert!(!generate_stored_name("ARB", "noext", now).contains('.'));
    }

    #[test]
    fn abbreviation_prefix_sanitized() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert!(generate_stored_name("I T/Ops", "a.pdf", now).starts_with("I_TOps_a_2026"));
        assert!(generate_stored_name("Architecture", "a.pdf", now).starts_with("Architectu_a_"));
        // nothing usable left: no prefix at all
        assert!(generate_stored_name(" ?* ", "a.pdf", now).starts_with("a_20260304050607_"));
    }

    #[test]
    fn stored_names_unique_for_same_file() {
        let now = Utc::now();
        let names: HashSet<String> = (0..50).map(|_| generate_stored_name("DB", "minutes.docx", now)).collect();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn path_under_container() {
        assert_eq!(storage_path(12, "a_1.pdf"), "meeting-items/12/a_1.pdf");
    }
}
