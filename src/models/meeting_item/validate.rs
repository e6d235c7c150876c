use super::types::{ItemFields, ItemStatus, Outcome, StatusChangeRequest, ValidItemFields};
use crate::auth::validate::{collect, validate_length_range, validate_optional, validate_range, validate_required};
use crate::responses::FieldError;

pub const MAX_TOPIC_LEN: usize = 200;
pub const MIN_PURPOSE_LEN: usize = 10;
pub const MAX_PURPOSE_LEN: usize = 2000;
pub const MAX_DIGITAL_PRODUCT_LEN: usize = 200;
pub const MAX_PERSON_LEN: usize = 50;
pub const MIN_DURATION: i64 = 1;
pub const MAX_DURATION: i64 = 480;
pub const MAX_COMMENT_LEN: usize = 1000;

/// Validate the static fields of a create or update request.
pub fn validate_item_fields(fields: &ItemFields) -> Result<ValidItemFields, Vec<FieldError>> {
    let mut errors = Vec::new();

    collect(&mut errors, "topic", validate_required(&fields.topic, "Topic", MAX_TOPIC_LEN));
    collect(
        &mut errors,
        "purpose",
        validate_length_range(&fields.purpose, "Purpose", MIN_PURPOSE_LEN, MAX_PURPOSE_LEN),
    );
    let outcome = match fields.outcome.parse::<Outcome>() {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            errors.push(FieldError::new("outcome", "Outcome must be Decision, Discussion or Information"));
            None
        }
    };
    collect(
        &mut errors,
        "digitalProduct",
        validate_required(&fields.digital_product, "Digital product", MAX_DIGITAL_PRODUCT_LEN),
    );
    collect(
        &mut errors,
        "duration",
        validate_range(fields.duration, "Duration", MIN_DURATION, MAX_DURATION, "minutes"),
    );
    collect(
        &mut errors,
        "ownerPresenter",
        validate_required(&fields.owner_presenter, "Owner/presenter", MAX_PERSON_LEN),
    );
    collect(&mut errors, "sponsor", validate_optional(fields.sponsor.as_deref(), "Sponsor", MAX_PERSON_LEN));

    match outcome {
        Some(outcome) if errors.is_empty() => Ok(ValidItemFields {
            topic: fields.topic.trim().to_string(),
            purpose: fields.purpose.trim().to_string(),
            outcome,
            digital_product: fields.digital_product.trim().to_string(),
            duration_minutes: fields.duration as i32,
            owner_presenter: fields.owner_presenter.trim().to_string(),
            sponsor: fields
                .sponsor
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }),
        _ => Err(errors),
    }
}

/// The requestor comes from the session, but is still bounded like the other person fields.
pub fn validate_requestor(username: &str) -> Option<FieldError> {
    validate_required(username, "Requestor", MAX_PERSON_LEN).map(|msg| FieldError::new("requestor", msg))
}

/// Validated status change.
#[derive(Debug, Clone)]
pub struct ValidStatusChange {
    pub status: ItemStatus,
    pub comment: Option<String>,
    pub denial_reason: Option<String>,
}

pub fn validate_status_change(req: &StatusChangeRequest) -> Result<ValidStatusChange, Vec<FieldError>> {
    let mut errors = Vec::new();

    let status = match req.status.parse::<ItemStatus>() {
        Ok(status) => Some(status),
        Err(msg) => {
            errors.push(FieldError::new("status", msg));
            None
        }
    };
    collect(&mut errors, "comment", validate_optional(req.comment.as_deref(), "Comment", MAX_COMMENT_LEN));

    let denial_reason = req.denial_reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    if status == Some(ItemStatus::Denied) {
        match denial_reason {
            None => errors.push(FieldError::new("denialReason", "A denial reason is required when denying an item")),
            Some(reason) if reason.chars().count() > MAX_COMMENT_LEN => errors.push(FieldError::new(
                "denialReason",
                format!("Denial reason must not exceed {MAX_COMMENT_LEN} characters"),
            )),
            Some(_) => {}
        }
    }

    match status {
        Some(status) if errors.is_empty() => Ok(ValidStatusChange {
            status,
            comment: req.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
            // Only kept when actually denying
            denial_reason: (status == ItemStatus::Denied).then(|| denial_reason.map(str::to_string)).flatten(),
        }),
        _ => Err(errors),
    }
}
