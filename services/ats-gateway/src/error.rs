//! Request-level errors and their HTTP mapping
//!
//! Validation failures are the caller's fault (400); anything the adapter
//! reports is an upstream failure (500). Both render as `{"error": "..."}`.

use ats_provider::AtsError;
use axum::http::StatusCode;
use thiserror::Error;

/// Fields `POST /candidates` must carry.
pub const REQUIRED_CANDIDATE_FIELDS: &[&str] = &["name", "email", "job_id"];

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing fields: {required:?}")]
    MissingFields { required: &'static [&'static str] },

    #[error("job_id query parameter is required")]
    MissingJobId,

    #[error(transparent)]
    Upstream(#[from] AtsError),
}

impl Error {
    pub fn missing_candidate_fields() -> Self {
        Error::MissingFields {
            required: REQUIRED_CANDIDATE_FIELDS,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson | Error::MissingFields { .. } | Error::MissingJobId => {
                StatusCode::BAD_REQUEST
            }
            Error::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        assert_eq!(Error::InvalidJson.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::MissingJobId.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::missing_candidate_fields().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_fields_message_lists_every_required_field() {
        let message = Error::missing_candidate_fields().to_string();
        assert_eq!(message, r#"Missing fields: ["name", "email", "job_id"]"#);
    }

    #[test]
    fn upstream_error_is_internal_with_upstream_text() {
        let err = Error::from(AtsError::Rejected("duplicate email".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.body(),
            serde_json::json!({"error": "upstream rejected request: duplicate email"})
        );
    }
}
