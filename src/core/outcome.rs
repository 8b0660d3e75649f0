//! Structured results for per-device operations
//!
//! Every network-calling operation on a single device returns an [`Outcome`]
//! rather than an error. A batch caller inspects the value, logs it and moves
//! on to the next device; nothing needs to be caught.
//!
//! For logging and reports an outcome serializes to the envelope
//! `{"ok", "status_code", "error", "response"}`. A successful single-device
//! fetch is reported as `{"ok": true, "device": {...}}` instead (see
//! [`Outcome::lookup_envelope`]).

use crate::device::models::DeviceRecord;
use crate::device::traits::TransportError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt::{self, Display};

/// A response body: parsed JSON when possible, raw text otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Parse a raw body, falling back to the text itself
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }
}

impl Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(value) => write!(f, "{}", value),
            ResponseBody::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Where in a per-device operation the failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input checks before any request is sent
    Validate,
    /// Serial number to identifier lookup in the directory
    Resolve,
    /// Reading the current device record
    FetchCurrent,
    /// Writing the updated device record
    Submit,
}

impl Stage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Resolve => "resolve",
            Stage::FetchCurrent => "fetch-current",
            Stage::Submit => "submit",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Empty device identifier
    BlankIdentifier,
    /// Input row without a serial number
    MissingSerial,
    /// Serial number not present in the device directory
    UnresolvedSerial,
    /// Transport timeout
    Timeout,
    /// Transport could not connect
    Connection,
    /// Any other transport failure
    Request,
    /// Non-2xx HTTP status
    HttpStatus,
    /// The response did not have the expected structure
    UnexpectedShape,
}

impl FailureKind {
    /// Whether the request never got an HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::Connection | FailureKind::Request
        )
    }
}

/// A failed per-device operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub stage: Stage,
    pub kind: FailureKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Human-readable detail
    pub error: Option<String>,
    /// Response body, when one was received
    pub response: Option<ResponseBody>,
}

impl Failure {
    pub fn new(stage: Stage, kind: FailureKind) -> Self {
        Self {
            stage,
            kind,
            status: None,
            error: None,
            response: None,
        }
    }

    pub fn blank_identifier() -> Self {
        Self::new(Stage::Validate, FailureKind::BlankIdentifier)
            .with_error("UDID cannot be blank")
    }

    pub fn missing_serial() -> Self {
        Self::new(Stage::Resolve, FailureKind::MissingSerial)
            .with_error("row has no serial number")
    }

    pub fn unresolved_serial(serial: &str) -> Self {
        Self::new(Stage::Resolve, FailureKind::UnresolvedSerial)
            .with_error(format!("serial number '{}' not found in device directory", serial))
    }

    pub fn transport(stage: Stage, err: &TransportError) -> Self {
        let kind = match err {
            TransportError::Timeout(_) => FailureKind::Timeout,
            TransportError::Connect(_) => FailureKind::Connection,
            TransportError::Request(_) => FailureKind::Request,
        };
        Self::new(stage, kind).with_error(err.to_string())
    }

    pub fn http_status(stage: Stage, status: u16, body: ResponseBody) -> Self {
        Self {
            stage,
            kind: FailureKind::HttpStatus,
            status: Some(status),
            error: None,
            response: Some(body),
        }
    }

    pub fn unexpected_shape(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, FailureKind::UnexpectedShape).with_error(message)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_response(mut self, response: ResponseBody) -> Self {
        self.response = Some(response);
        self
    }

    pub fn is_transport(&self) -> bool {
        self.kind.is_transport()
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.stage)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(ref error) = self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// Result of a per-device operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = ResponseBody> {
    Success { status: u16, value: T },
    Failure(Failure),
}

impl<T> Outcome<T> {
    pub fn success(status: u16, value: T) -> Self {
        Outcome::Success { status, value }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// HTTP status of the final request, if one was answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Outcome::Success { status, .. } => Some(*status),
            Outcome::Failure(failure) => failure.status,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Outcome::Success { value, .. } => Ok(value),
            Outcome::Failure(failure) => Err(failure),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success { status, value } => Outcome::Success {
                status,
                value: f(value),
            },
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 4)?;
        match self {
            Outcome::Success { status, value } => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("status_code", &Some(*status))?;
                state.serialize_field("error", &None::<String>)?;
                state.serialize_field("response", value)?;
            }
            Outcome::Failure(failure) => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("status_code", &failure.status)?;
                state.serialize_field("error", &failure.error)?;
                state.serialize_field("response", &failure.response)?;
            }
        }
        state.end()
    }
}

impl Outcome<DeviceRecord> {
    /// Envelope for a single-device lookup
    pub fn lookup_envelope(&self) -> Value {
        match self {
            Outcome::Success { value, .. } => {
                let mut envelope = Map::new();
                envelope.insert("ok".to_string(), Value::Bool(true));
                envelope.insert("device".to_string(), value.clone().into_value());
                Value::Object(envelope)
            }
            Outcome::Failure(failure) => json!({
                "ok": false,
                "status_code": failure.status,
                "error": failure.error,
                "response": failure.response,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_body_parse() {
        assert_eq!(
            ResponseBody::parse(r#"{"code":200}"#),
            ResponseBody::Json(json!({"code": 200}))
        );
        assert_eq!(
            ResponseBody::parse("Bad Gateway"),
            ResponseBody::Text("Bad Gateway".to_string())
        );
        assert_eq!(ResponseBody::parse(""), ResponseBody::Text(String::new()));
    }

    #[test]
    fn test_transport_failure_kinds() {
        let timeout = Failure::transport(Stage::Submit, &TransportError::Timeout("t".into()));
        assert_eq!(timeout.kind, FailureKind::Timeout);
        assert!(timeout.is_transport());
        assert_eq!(timeout.error.as_deref(), Some("timeout: t"));

        let refused = Failure::transport(Stage::Submit, &TransportError::Connect("c".into()));
        assert_eq!(refused.kind, FailureKind::Connection);

        let other = Failure::transport(Stage::FetchCurrent, &TransportError::Request("r".into()));
        assert_eq!(other.kind, FailureKind::Request);
        assert_eq!(other.stage, Stage::FetchCurrent);

        let http = Failure::http_status(Stage::Submit, 404, ResponseBody::parse("nope"));
        assert!(!http.is_transport());
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::http_status(Stage::Submit, 500, ResponseBody::parse("boom"))
            .with_error("server error");
        assert_eq!(failure.to_string(), "submit failed (HTTP 500): server error");
        assert_eq!(
            Failure::blank_identifier().to_string(),
            "validate failed: UDID cannot be blank"
        );
    }

    #[test]
    fn test_outcome_envelope_serialization() {
        let ok: Outcome = Outcome::success(200, ResponseBody::parse(r#"{"code":200}"#));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"ok": true, "status_code": 200, "error": null, "response": {"code": 200}})
        );

        let failed: Outcome = Failure::http_status(Stage::Submit, 404, ResponseBody::parse("missing")).into();
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"ok": false, "status_code": 404, "error": null, "response": "missing"})
        );
    }

    #[test]
    fn test_lookup_envelope_reports_device() {
        let record = DeviceRecord::from_value(json!({"UDID": "u1", "notes": "A"})).unwrap();
        let found = Outcome::success(200, record);
        assert_eq!(
            found.lookup_envelope(),
            json!({"ok": true, "device": {"UDID": "u1", "notes": "A"}})
        );

        let missing: Outcome<DeviceRecord> =
            Failure::http_status(Stage::FetchCurrent, 404, ResponseBody::parse("gone")).into();
        assert_eq!(
            missing.lookup_envelope(),
            json!({"ok": false, "status_code": 404, "error": null, "response": "gone"})
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: Outcome<u32> = Outcome::success(201, 7);
        assert!(ok.is_ok());
        assert_eq!(ok.status_code(), Some(201));
        assert_eq!(ok.value(), Some(&7));
        assert_eq!(ok.clone().map(|v| v * 2).into_result(), Ok(14));

        let failed: Outcome<u32> = Failure::missing_serial().into();
        assert!(!failed.is_ok());
        assert_eq!(failed.status_code(), None);
        assert_eq!(failed.failure().map(|f| f.kind), Some(FailureKind::MissingSerial));
        assert!(failed.into_result().is_err());
    }
}
