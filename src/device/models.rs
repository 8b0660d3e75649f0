//! Wire types for the device-management API
//!
//! List endpoints are decoded into typed structs. The single-device record is
//! kept as a JSON object so that fields this tool does not know about are
//! preserved, and so that a missing `notes` key can be told apart from a null
//! one.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry of the `GET /devices` listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Unique device identifier
    #[serde(rename = "UDID")]
    pub udid: String,
    /// Hardware serial number
    #[serde(rename = "serialNumber", default)]
    pub serial_number: Option<String>,
    /// Display name (e.g., "Library iPad 12")
    #[serde(default)]
    pub name: Option<String>,
    /// Device class (e.g., "ipad", "iphone", "mac")
    #[serde(default)]
    pub class: Option<String>,
    /// Location the device is assigned to
    #[serde(
        rename = "locationId",
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_id: Option<String>,
}

impl DeviceSummary {
    pub fn new(udid: &str, serial_number: &str, name: &str, class: &str) -> Self {
        Self {
            udid: udid.to_string(),
            serial_number: Some(serial_number.to_string()),
            name: Some(name.to_string()),
            class: Some(class.to_string()),
            location_id: None,
        }
    }

    pub fn with_location(mut self, location_id: &str) -> Self {
        self.location_id = Some(location_id.to_string());
        self
    }
}

/// One entry of the `GET /locations/` listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Location id, normalized to a string whether the API sends a number or a string
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display name
    pub name: String,
}

impl Location {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Body of `GET /devices`
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceSummary>,
}

/// Body of `GET /locations/`
#[derive(Debug, Clone, Deserialize)]
pub struct LocationListResponse {
    pub locations: Vec<Location>,
}

/// State of the `notes` key on a fetched device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesField<'a> {
    /// The key is not present at all
    Missing,
    /// The key is present and null
    Null,
    /// The key holds text
    Text(&'a str),
}

/// A single device as returned by `GET /devices/{udid}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceRecord {
    fields: Map<String, Value>,
}

impl DeviceRecord {
    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn udid(&self) -> Option<&str> {
        self.fields.get("UDID").and_then(Value::as_str)
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.fields.get("serialNumber").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn notes_field(&self) -> NotesField<'_> {
        match self.fields.get("notes") {
            None => NotesField::Missing,
            Some(Value::Null) => NotesField::Null,
            Some(Value::String(text)) => NotesField::Text(text),
            // Non-string notes are not produced by the API; treat like text-less.
            Some(_) => NotesField::Null,
        }
    }

    /// Raw field access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Ids arrive as numbers from some API versions and as strings from others
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, found {}",
            other
        ))),
    }
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, found {}",
            other
        ))),
    }
}
