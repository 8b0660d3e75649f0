//! In-memory device-management API for testing without a server
//!
//! `MockApi` implements [`Transport`] over a small fleet of devices and
//! locations. It answers the same endpoints the real API does, records every
//! request it receives, and can be told to fail specific calls.

use crate::device::models::Location;
use crate::device::traits::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use serde_json::{json, Map, Value};
use std::sync::{Mutex, MutexGuard};

/// A device held by the mock API
#[derive(Debug, Clone, PartialEq)]
pub struct MockDevice {
    fields: Map<String, Value>,
}

impl MockDevice {
    /// Create an iPad with empty notes and no location
    pub fn new(udid: &str, serial_number: &str, name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("UDID".to_string(), json!(udid));
        fields.insert("serialNumber".to_string(), json!(serial_number));
        fields.insert("name".to_string(), json!(name));
        fields.insert("class".to_string(), json!("ipad"));
        fields.insert("notes".to_string(), json!(""));
        Self { fields }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.fields.insert("class".to_string(), json!(class));
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.fields.insert("notes".to_string(), json!(notes));
        self
    }

    pub fn with_null_notes(mut self) -> Self {
        self.fields.insert("notes".to_string(), Value::Null);
        self
    }

    /// Leave the `notes` key out of the device record entirely
    pub fn without_notes_field(mut self) -> Self {
        self.fields.remove("notes");
        self
    }

    pub fn in_location(mut self, location_id: &str) -> Self {
        self.fields.insert("locationId".to_string(), json!(location_id));
        self
    }

    pub fn udid(&self) -> &str {
        self.fields.get("UDID").and_then(Value::as_str).unwrap_or("")
    }

    pub fn location_id(&self) -> Option<&str> {
        self.fields.get("locationId").and_then(Value::as_str)
    }

    /// Notes text; `Some("")` for null notes, `None` when the key is absent
    pub fn notes(&self) -> Option<String> {
        match self.fields.get("notes") {
            None => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => Some(String::new()),
        }
    }

    /// The fields returned by the list endpoint
    fn summary(&self) -> Value {
        let mut summary = Map::new();
        for key in ["UDID", "serialNumber", "name", "class", "locationId"] {
            if let Some(value) = self.fields.get(key) {
                summary.insert(key.to_string(), value.clone());
            }
        }
        Value::Object(summary)
    }
}

/// How a faulted request fails
#[derive(Debug, Clone, PartialEq)]
pub enum FaultKind {
    /// The transport times out
    Timeout,
    /// The transport cannot connect
    ConnectionRefused,
    /// The API answers with this status and body
    Respond { status: u16, body: String },
}

/// A scripted failure for requests matching a method and path
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub method: Method,
    /// Path without leading or trailing slashes (e.g. "devices/ABC/details")
    pub path: String,
    pub kind: FaultKind,
    /// Number of matching requests to fail (`None` = all of them)
    pub remaining: Option<usize>,
}

impl Fault {
    pub fn new(method: Method, path: &str, kind: FaultKind) -> Self {
        Self {
            method,
            path: normalize_path(path).to_string(),
            kind,
            remaining: None,
        }
    }

    pub fn timeout(method: Method, path: &str) -> Self {
        Self::new(method, path, FaultKind::Timeout)
    }

    pub fn connection_refused(method: Method, path: &str) -> Self {
        Self::new(method, path, FaultKind::ConnectionRefused)
    }

    /// Answer with a non-success status
    pub fn status(method: Method, path: &str, status: u16, body: &str) -> Self {
        Self::new(
            method,
            path,
            FaultKind::Respond {
                status,
                body: body.to_string(),
            },
        )
    }

    /// Answer with an arbitrary body, typically a 2xx with an unexpected shape
    pub fn body(method: Method, path: &str, status: u16, body: &str) -> Self {
        Self::status(method, path, status, body)
    }

    /// Only fail the first `count` matching requests
    pub fn times(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }

    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && self.path == normalize_path(&request.path)
            && self.remaining != Some(0)
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    locations: Vec<Location>,
    faults: Vec<Fault>,
    requests: Vec<ApiRequest>,
}

/// Mock device-management API
#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, device: MockDevice) -> Self {
        self.add_device(device);
        self
    }

    pub fn with_location(self, id: &str, name: &str) -> Self {
        self.state().locations.push(Location::new(id, name));
        self
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.state().faults.push(fault);
        self
    }

    /// Add a device after construction (e.g. to simulate upstream changes)
    pub fn add_device(&self, device: MockDevice) {
        self.state().devices.push(device);
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    pub fn count_requests(&self, method: Method) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn device_count(&self) -> usize {
        self.state().devices.len()
    }

    /// Current notes of a device (see [`MockDevice::notes`])
    pub fn notes_of(&self, udid: &str) -> Option<String> {
        self.state()
            .devices
            .iter()
            .find(|d| d.udid() == udid)
            .and_then(MockDevice::notes)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MockApi {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state();
        state.requests.push(request.clone());

        if let Some(fault) = state.faults.iter_mut().find(|f| f.matches(request)) {
            if let Some(ref mut remaining) = fault.remaining {
                *remaining -= 1;
            }
            return match fault.kind {
                FaultKind::Timeout => Err(TransportError::Timeout(
                    "operation timed out".to_string(),
                )),
                FaultKind::ConnectionRefused => Err(TransportError::Connect(
                    "Connection refused (os error 111)".to_string(),
                )),
                FaultKind::Respond { status, ref body } => Ok(ApiResponse::new(status, body.clone())),
            };
        }

        let path = normalize_path(&request.path).to_string();
        let segments: Vec<&str> = path.split('/').collect();

        let response = match (request.method, segments.as_slice()) {
            (Method::Get, ["devices"]) => list_devices(&state, request.query_value("location")),
            (Method::Get, ["locations"]) => list_locations(&state),
            (Method::Get, ["devices", udid]) => get_device(&state, &decode_segment(udid)),
            (Method::Post, ["devices", udid, "details"]) => {
                save_details(&mut state, &decode_segment(udid), request.body.as_ref())
            }
            _ => ApiResponse::new(404, "Not Found"),
        };
        Ok(response)
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Percent-decode one path segment the way the server would
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn list_devices(state: &MockState, location: Option<&str>) -> ApiResponse {
    let devices: Vec<Value> = state
        .devices
        .iter()
        .filter(|d| location.map_or(true, |loc| d.location_id() == Some(loc)))
        .map(MockDevice::summary)
        .collect();
    ApiResponse::json(
        200,
        &json!({ "code": 200, "count": devices.len(), "devices": devices }),
    )
}

fn list_locations(state: &MockState) -> ApiResponse {
    let locations: Vec<Value> = state
        .locations
        .iter()
        .map(|l| json!({ "id": l.id, "name": l.name }))
        .collect();
    ApiResponse::json(
        200,
        &json!({ "code": 200, "count": locations.len(), "locations": locations }),
    )
}

fn get_device(state: &MockState, udid: &str) -> ApiResponse {
    match state.devices.iter().find(|d| d.udid() == udid) {
        Some(device) => ApiResponse::json(
            200,
            &json!({ "code": 200, "device": Value::Object(device.fields.clone()) }),
        ),
        None => ApiResponse::json(404, &json!({ "code": 404, "message": "DeviceNotFound" })),
    }
}

fn save_details(state: &mut MockState, udid: &str, body: Option<&Value>) -> ApiResponse {
    let Some(notes) = body.and_then(|b| b.get("notes")).and_then(Value::as_str) else {
        return ApiResponse::json(400, &json!({ "code": 400, "message": "InvalidRequest" }));
    };

    match state.devices.iter_mut().find(|d| d.udid() == udid) {
        Some(device) => {
            device.fields.insert("notes".to_string(), json!(notes));
            ApiResponse::json(200, &json!({ "code": 200, "message": "DeviceDetailsSaved" }))
        }
        None => ApiResponse::json(404, &json!({ "code": 404, "message": "DeviceNotFound" })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_requests() {
        let api = MockApi::new().with_device(MockDevice::new("u1", "S1", "iPad"));
        api.send(&ApiRequest::get("devices")).unwrap();
        api.send(&ApiRequest::get("/devices/u1/").with_query("includeApps", "false"))
            .unwrap();
        assert_eq!(api.request_count(), 2);
        assert_eq!(api.count_requests(Method::Get), 2);
        assert_eq!(api.count_requests(Method::Post), 0);
    }

    #[test]
    fn test_location_filter() {
        let api = MockApi::new()
            .with_device(MockDevice::new("u1", "S1", "a").in_location("1"))
            .with_device(MockDevice::new("u2", "S2", "b").in_location("2"))
            .with_device(MockDevice::new("u3", "S3", "c"));
        let all = api.send(&ApiRequest::get("devices")).unwrap().json_body().unwrap();
        assert_eq!(all["devices"].as_array().unwrap().len(), 3);

        let filtered = api
            .send(&ApiRequest::get("devices").with_query("location", "2"))
            .unwrap()
            .json_body()
            .unwrap();
        let devices = filtered["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["UDID"], "u2");
        assert!(devices[0].get("notes").is_none());
    }

    #[test]
    fn test_fault_limited_times() {
        let api = MockApi::new()
            .with_device(MockDevice::new("u1", "S1", "a"))
            .with_fault(Fault::timeout(Method::Get, "devices/u1").times(1));

        assert!(matches!(
            api.send(&ApiRequest::get("devices/u1")),
            Err(TransportError::Timeout(_))
        ));
        assert_eq!(api.send(&ApiRequest::get("devices/u1")).unwrap().status, 200);
    }

    #[test]
    fn test_save_details_requires_notes() {
        let api = MockApi::new().with_device(MockDevice::new("u1", "S1", "a"));
        let response = api
            .send(&ApiRequest::post_json("devices/u1/details", json!({"udid": "u1"})))
            .unwrap();
        assert_eq!(response.status, 400);

        let response = api
            .send(&ApiRequest::post_json(
                "devices/u1/details",
                json!({"udid": "u1", "notes": "x"}),
            ))
            .unwrap();
        assert!(response.is_success());
        assert_eq!(api.notes_of("u1").as_deref(), Some("x"));
    }

    #[test]
    fn test_unknown_route() {
        let api = MockApi::new();
        let response = api.send(&ApiRequest::get("apps")).unwrap();
        assert_eq!(response.status, 404);
    }
}
