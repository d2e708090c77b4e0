//! Response envelope
//!
//! Every endpoint answers `{status, message, errors?, ...payload}`. Any status
//! other than `"success"` is a failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    #[serde(other)]
    Error,
}

/// Payload for responses that carry nothing beyond the envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

/// Standard response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = Empty> {
    pub status: Status,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, payload: T) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            errors: None,
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            errors: None,
            payload: None,
        }
    }

    /// Failure with field-level validation messages
    pub fn invalid(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            errors: Some(errors),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Same envelope with the payload transformed
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            message: self.message,
            errors: self.errors,
            payload: self.payload.map(f),
        }
    }
}

impl ApiResponse<Empty> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::success(message, Empty {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Saved {
        redirect_url: String,
    }

    #[test]
    fn test_payload_is_flattened() {
        let resp = ApiResponse::success(
            "Saved",
            Saved {
                redirect_url: "/pricing/".to_string(),
            },
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["redirect_url"], "/pricing/");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_unknown_status_is_failure() {
        let resp: ApiResponse<Empty> =
            serde_json::from_str(r#"{"status": "forbidden", "message": "no"}"#).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.message, "no");
    }

    #[test]
    fn test_failure_without_payload_fields() {
        let raw = r#"{"status": "error", "message": "Validation failed",
                      "errors": {"price": ["Must be at least 0.01"]}}"#;
        let resp: ApiResponse<Saved> = serde_json::from_str(raw).unwrap();
        assert!(!resp.is_success());
        assert!(resp.payload.is_none());
        assert_eq!(resp.errors.unwrap()["price"], vec!["Must be at least 0.01"]);
    }
}
