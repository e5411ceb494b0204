//! Wire shapes for `POST /render` on a Manim render server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body posted to the render endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Full Python source handed to Manim.
    pub code: String,
    /// Scene class to render.
    pub scene: String,
    /// Requested output format, forwarded verbatim (`mp4`, `gif`, `png`, `svg`, `webm`, ...).
    pub format: String,
    /// Requested quality preset (`low`, `medium`, `high`).
    pub quality: String,
}

/// Body returned by the render endpoint on a 2xx status.
///
/// Every field is optional on the wire. A missing `success` counts as a failed
/// render; `filename` and `data` are validated by the caller once `success` is
/// known to be true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    /// Base64 encoded media bytes.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Optional body carried by non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<Value>,
}

impl ErrorBody {
    /// The server supplied error text. See [`error_text`].
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().and_then(error_text)
    }
}

impl RenderResponse {
    /// The server supplied error text. See [`error_text`].
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(error_text)
    }
}

/// Display text for an `error` value of any JSON type.
///
/// Strings are shown as-is, other values as compact JSON. `null`, `false`,
/// `0` and the empty string carry no message.
pub fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_all_fields() {
        let request = RenderRequest {
            code: "print(1)".into(),
            scene: "Scene".into(),
            format: "mp4".into(),
            quality: "low".into(),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "code": "print(1)",
                "scene": "Scene",
                "format": "mp4",
                "quality": "low"
            })
        );
    }

    #[test]
    fn response_ignores_extra_fields() {
        let body = r#"{"success":false,"error":"manim failed","stdout":"","stderr":"trace"}"#;
        let response: RenderResponse = serde_json::from_str(body).expect("parse");
        assert!(!response.success);
        assert_eq!(response.error_message().as_deref(), Some("manim failed"));
        assert_eq!(response.filename, None);
    }

    #[test]
    fn empty_error_strings_count_as_absent() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":""}"#).expect("parse");
        assert_eq!(body.message(), None);
    }

    #[test]
    fn missing_success_flag_means_failure() {
        let response: RenderResponse =
            serde_json::from_str(r#"{"error":"bad"}"#).expect("parse");
        assert!(!response.success);
        assert_eq!(response.error_message().as_deref(), Some("bad"));
    }

    #[test]
    fn non_string_errors_are_rendered_as_json() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":42}"#).expect("parse");
        assert_eq!(body.message().as_deref(), Some("42"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"error":{"line":3}}"#).expect("parse");
        assert_eq!(body.message().as_deref(), Some(r#"{"line":3}"#));

        for falsy in [r#"{"error":null}"#, r#"{"error":false}"#, r#"{"error":0}"#] {
            let body: ErrorBody = serde_json::from_str(falsy).expect("parse");
            assert_eq!(body.message(), None, "{falsy}");
        }
    }
}
