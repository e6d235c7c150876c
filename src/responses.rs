use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

/// A single field-level validation message.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError { field: field.into(), message: message.into() }
    }
}

/// Uniform envelope for every API response, success or failure.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error_message: Option<String>,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error_message: None,
            status_code: 200,
            errors: Vec::new(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(status: StatusCode, message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_message: Some(message.into()),
            status_code: status.as_u16(),
            errors,
        }
    }

    /// Render a failure envelope as an HTTP response with matching status.
    pub fn error_response(status: StatusCode, message: impl Into<String>, errors: Vec<FieldError>) -> HttpResponse {
        HttpResponse::build(status).json(Self::failure(status, message, errors))
    }
}

/// 200 OK with the success envelope.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(data))
}

/// 201 Created with the success envelope.
pub fn created<T: Serialize>(data: T) -> HttpResponse {
    let mut body = ApiResponse::ok(data);
    body.status_code = StatusCode::CREATED.as_u16();
    HttpResponse::Created().json(body)
}

/// Generic paginated list payload.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

pub const MAX_PER_PAGE: i64 = 100;
/// Keeps `(page - 1) * per_page` inside i64.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Parse `page` / `per_page` query params: page in 1..=MAX_PAGE, per_page in 1..=100 (default 25).
pub fn page_params(query: &std::collections::HashMap<String, String>) -> (i64, i64) {
    let page = query
        .get("page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_PAGE);
    let per_page = query
        .get("per_page")
        .or_else(|| query.get("perPage"))
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(25)
        .clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn success_envelope_omits_empty_errors() {
        let json = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert_eq!(json["statusCode"], 200);
        assert!(json["errorMessage"].is_null());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn failure_envelope_carries_field_errors() {
        let env = ApiResponse::failure(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            vec![FieldError::new("topic", "This field is required")],
        );
        let json = serde_json::to_value(env).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["errors"][0]["field"], "topic");
    }

    #[test]
    fn page_params_clamped() {
        let mut q = HashMap::new();
        q.insert("page".to_string(), "0".to_string());
        q.insert("per_page".to_string(), "500".to_string());
        assert_eq!(page_params(&q), (1, 100));
        assert_eq!(page_params(&HashMap::new()), (1, 25));
    }

    #[test]
    fn huge_page_does_not_overflow_offset() {
        let mut q = HashMap::new();
        q.insert("page".to_string(), i64::MAX.to_string());
        q.insert("perPage".to_string(), "100".to_string());
        let (page, per_page) = page_params(&q);
        assert_eq!(page, MAX_PAGE);
        assert!((page - 1).checked_mul(per_page).is_some());
    }
}
